//! Records of the three raw sources and their county-year aggregates

use std::sync::Arc;

use arrow::datatypes::{DataType, Field};
use arrow_schema::FieldRef;
use serde::{Deserialize, Serialize};

use crate::utils::fips::deserialize_fips;
use crate::utils::io::ParquetRecord;

/// One ARCOS transaction line as published in the DEA extract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcosTransaction {
    #[serde(rename = "BUYER_STATE")]
    pub buyer_state: String,
    #[serde(rename = "BUYER_COUNTY")]
    pub buyer_county: String,
    /// `MMDDYYYY`, sometimes with the leading zero dropped
    #[serde(rename = "TRANSACTION_DATE")]
    pub transaction_date: String,
    /// Grams of active base drug
    #[serde(rename = "CALC_BASE_WT_IN_GM")]
    pub calc_base_wt_in_gm: Option<f64>,
    #[serde(rename = "MME_Conversion_Factor")]
    pub mme_conversion_factor: Option<f64>,
    /// Pills shipped
    #[serde(rename = "DOSAGE_UNIT")]
    pub dosage_unit: Option<f64>,
}

impl ArcosTransaction {
    /// Morphine milligram equivalents of this shipment
    #[must_use]
    pub fn mme(&self) -> Option<f64> {
        Some(self.calc_base_wt_in_gm? * 1000.0 * self.mme_conversion_factor?)
    }
}

/// Crosswalk line mapping a county name to its FIPS code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosswalkRow {
    pub state: String,
    pub county: String,
    #[serde(deserialize_with = "deserialize_fips")]
    pub fips: String,
}

/// Opioid shipments of one county in one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcosCountyYear {
    #[serde(deserialize_with = "deserialize_fips")]
    pub fips: String,
    pub year: i32,
    pub opioid_shipments_mme: f64,
    pub total_pills: Option<f64>,
}

impl ParquetRecord for ArcosCountyYear {
    fn arrow_fields() -> Vec<FieldRef> {
        vec![
            Arc::new(Field::new("fips", DataType::Utf8, false)),
            Arc::new(Field::new("year", DataType::Int32, false)),
            Arc::new(Field::new("opioid_shipments_mme", DataType::Float64, false)),
            Arc::new(Field::new("total_pills", DataType::Float64, true)),
        ]
    }
}

/// Drug overdose deaths of one county in one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortalityRecord {
    #[serde(deserialize_with = "deserialize_fips")]
    pub fips: String,
    pub year: i32,
    /// Missing when the count was suppressed or not reported
    pub drug_deaths: Option<f64>,
    /// The source withheld the count for privacy
    #[serde(default)]
    pub suppressed: bool,
    /// The count was filled in by imputation
    #[serde(default)]
    pub death_imputed: bool,
}

impl ParquetRecord for MortalityRecord {
    fn arrow_fields() -> Vec<FieldRef> {
        vec![
            Arc::new(Field::new("fips", DataType::Utf8, false)),
            Arc::new(Field::new("year", DataType::Int32, false)),
            Arc::new(Field::new("drug_deaths", DataType::Float64, true)),
            Arc::new(Field::new("suppressed", DataType::Boolean, false)),
            Arc::new(Field::new("death_imputed", DataType::Boolean, false)),
        ]
    }
}

/// Resident population of one county in one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    #[serde(deserialize_with = "deserialize_fips")]
    pub fips: String,
    pub year: i32,
    pub state_abbrev: String,
    #[serde(default)]
    pub county_name: Option<String>,
    pub population: f64,
}

impl ParquetRecord for PopulationRecord {
    fn arrow_fields() -> Vec<FieldRef> {
        vec![
            Arc::new(Field::new("fips", DataType::Utf8, false)),
            Arc::new(Field::new("year", DataType::Int32, false)),
            Arc::new(Field::new("state_abbrev", DataType::Utf8, false)),
            Arc::new(Field::new("county_name", DataType::Utf8, true)),
            Arc::new(Field::new("population", DataType::Float64, false)),
        ]
    }
}
