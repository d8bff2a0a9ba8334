//! The county-year panel row and the outcomes measured on it

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field};
use arrow_schema::FieldRef;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::fips::deserialize_fips;
use crate::utils::io::ParquetRecord;

/// Scale of all per-capita rates
pub const PER_CAPITA_SCALE: f64 = 100_000.0;

/// Rate per 100k residents, missing when either input is unusable
#[must_use]
pub fn per_100k(count: Option<f64>, population: f64) -> Option<f64> {
    let count = count?;
    (population > 0.0 && count.is_finite()).then(|| count / population * PER_CAPITA_SCALE)
}

/// One county in one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyYear {
    #[serde(deserialize_with = "deserialize_fips")]
    pub fips: String,
    pub year: i32,
    pub state_abbrev: String,
    #[serde(default)]
    pub county_name: Option<String>,
    pub population: f64,
    #[serde(default)]
    pub drug_deaths: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub death_imputed: bool,
    #[serde(default)]
    pub opioid_shipments_mme: Option<f64>,
    #[serde(default)]
    pub total_pills: Option<f64>,
    #[serde(default)]
    pub drug_death_rate_per_100k: Option<f64>,
    #[serde(default)]
    pub mme_per_100k: Option<f64>,
    /// Set only on analysis panels
    #[serde(default, deserialize_with = "deserialize_opt_flag")]
    pub is_pre: Option<bool>,
}

impl CountyYear {
    /// Recompute both per-capita rates from counts and population
    pub fn refresh_rates(&mut self) {
        self.drug_death_rate_per_100k = per_100k(self.drug_deaths, self.population);
        self.mme_per_100k = per_100k(self.opioid_shipments_mme, self.population);
    }
}

impl ParquetRecord for CountyYear {
    fn arrow_fields() -> Vec<FieldRef> {
        vec![
            Arc::new(Field::new("fips", DataType::Utf8, false)),
            Arc::new(Field::new("year", DataType::Int32, false)),
            Arc::new(Field::new("state_abbrev", DataType::Utf8, false)),
            Arc::new(Field::new("county_name", DataType::Utf8, true)),
            Arc::new(Field::new("population", DataType::Float64, false)),
            Arc::new(Field::new("drug_deaths", DataType::Float64, true)),
            Arc::new(Field::new("death_imputed", DataType::Boolean, false)),
            Arc::new(Field::new("opioid_shipments_mme", DataType::Float64, true)),
            Arc::new(Field::new("total_pills", DataType::Float64, true)),
            Arc::new(Field::new("drug_death_rate_per_100k", DataType::Float64, true)),
            Arc::new(Field::new("mme_per_100k", DataType::Float64, true)),
            Arc::new(Field::new("is_pre", DataType::Boolean, true)),
        ]
    }
}

/// Outcomes the policy is evaluated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Opioid shipments in MME per 100k residents
    MmePer100k,
    /// Drug overdose deaths per 100k residents
    DeathRatePer100k,
}

impl Outcome {
    /// Both outcomes in reporting order
    pub const ALL: [Outcome; 2] = [Outcome::MmePer100k, Outcome::DeathRatePer100k];

    /// Column name in the panel
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::MmePer100k => "mme_per_100k",
            Self::DeathRatePer100k => "drug_death_rate_per_100k",
        }
    }

    /// Label used in result tables
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::MmePer100k => "Opioid Shipments (MME per 100k)",
            Self::DeathRatePer100k => "Drug Deaths (per 100k)",
        }
    }

    /// Value of the outcome on a row, derived from counts when the rate column is empty
    #[must_use]
    pub fn value(self, row: &CountyYear) -> Option<f64> {
        match self {
            Self::MmePer100k => row
                .mme_per_100k
                .or_else(|| per_100k(row.opioid_shipments_mme, row.population)),
            Self::DeathRatePer100k => row
                .drug_death_rate_per_100k
                .or_else(|| per_100k(row.drug_deaths, row.population)),
        }
        .filter(|v| v.is_finite())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl std::str::FromStr for Outcome {
    type Err = crate::error::StudyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mme" | "mme_per_100k" | "shipments" => Ok(Self::MmePer100k),
            "deaths" | "drug_death_rate_per_100k" | "mortality" => Ok(Self::DeathRatePer100k),
            other => Err(crate::error::StudyError::Config(format!(
                "unknown outcome '{other}'"
            ))),
        }
    }
}

// Older panels store flags as 0/1 integers.
struct FlagVisitor;

impl Visitor<'_> for FlagVisitor {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean or 0/1 flag")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
        match v {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::custom(format!("flag must be 0 or 1, got {v}"))),
        }
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
        self.visit_i64(i64::try_from(v).map_err(E::custom)?)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<bool, E> {
        if v == 0.0 {
            Ok(false)
        } else if v == 1.0 {
            Ok(true)
        } else {
            Err(E::custom(format!("flag must be 0 or 1, got {v}")))
        }
    }
}

fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(deserialize_opt_flag(deserializer)?.unwrap_or(false))
}

fn deserialize_opt_flag<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<bool>, D::Error> {
    struct OptFlagVisitor;

    impl<'de> Visitor<'de> for OptFlagVisitor {
        type Value = Option<bool>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an optional flag")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(FlagVisitor).map(Some)
        }
    }

    deserializer.deserialize_option(OptFlagVisitor)
}
