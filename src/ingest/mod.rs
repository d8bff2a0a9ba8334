//! Raw source ingestion
//!
//! Turns the three downloads (ARCOS transactions, CDC WONDER mortality,
//! Census estimates) into the county-year Parquet inputs of the panel
//! builder.

pub mod arcos;
pub mod census;
pub mod mortality;
pub mod states;

use std::time::Instant;

use crate::config::StudyConfig;
use crate::error::{Result, StudyError};
use crate::models::CrosswalkRow;
use crate::utils::io::{read_csv, write_records};
use crate::utils::logging::log_section;

pub use arcos::{ArcosAggregator, ArcosSummary, Crosswalk, aggregate_arcos, aggregate_arcos_file};
pub use census::{merge_population, read_census_csv};
pub use mortality::{DeathCount, apply_suppression_policy, read_mortality_csv};
pub use states::{state_abbrev, state_fips};

/// Row counts of the processed inputs
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub population_rows: usize,
    pub mortality_rows: usize,
    pub suppressed_rows: usize,
    pub imputed_rows: usize,
    pub shipment_rows: usize,
    pub arcos: ArcosSummary,
}

/// Build the processed county-year inputs from raw downloads
pub fn ingest_raw_sources(config: &StudyConfig) -> Result<IngestSummary> {
    log_section("INGESTING RAW SOURCES");
    let start = Instant::now();
    let raw = &config.raw_dir;

    if config.raw.census_population.is_empty() {
        return Err(StudyError::Config("no Census population files configured".to_string()));
    }
    let population = merge_population(
        config
            .raw
            .census_population
            .iter()
            .map(|name| read_census_csv(&raw.join(name), config.years()))
            .collect::<Result<Vec<_>>>()?,
    );

    let mut mortality: Vec<_> = read_mortality_csv(&raw.join(&config.raw.mortality))?
        .into_iter()
        .filter(|r| config.years().contains(&r.year))
        .collect();
    let imputed = apply_suppression_policy(&mut mortality, &population, config.suppression)?;

    let crosswalk = Crosswalk::from_rows(read_csv::<CrosswalkRow>(
        &raw.join(&config.raw.county_crosswalk),
    )?);
    if crosswalk.is_empty() {
        return Err(StudyError::validation("county crosswalk is empty"));
    }
    let (shipments, arcos) = aggregate_arcos_file(
        &raw.join(&config.raw.arcos_transactions),
        &crosswalk,
        config.years(),
    )?;

    write_records(&config.population_path(), &population)?;
    write_records(&config.deaths_path(), &mortality)?;
    write_records(&config.shipments_path(), &shipments)?;

    let summary = IngestSummary {
        population_rows: population.len(),
        mortality_rows: mortality.len(),
        suppressed_rows: mortality.iter().filter(|r| r.suppressed).count(),
        imputed_rows: imputed,
        shipment_rows: shipments.len(),
        arcos,
    };
    log::info!("Ingestion finished in {:?}: {summary:?}", start.elapsed());
    Ok(summary)
}
