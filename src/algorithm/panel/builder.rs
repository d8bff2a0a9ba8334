//! Panel builder implementation
//!
//! Merges population, mortality and shipments into one county-year panel.
//! Population defines the grid: every county-year it carries appears in the
//! panel, with deaths and shipments left-joined onto it.

use std::collections::BTreeSet;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::{PolicyCase, StudyConfig};
use crate::error::{Result, StudyError};
use crate::models::{ArcosCountyYear, CountyYear, MortalityRecord, PopulationRecord};
use crate::utils::io::{read_records_async, write_records};
use crate::utils::logging::log_section;

/// Non-missing counts of a built panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelDiagnostics {
    pub rows: usize,
    pub counties: usize,
    pub with_deaths: usize,
    pub with_shipments: usize,
    pub imputed_deaths: usize,
}

impl PanelDiagnostics {
    #[must_use]
    pub fn of(rows: &[CountyYear]) -> Self {
        Self {
            rows: rows.len(),
            counties: rows.iter().map(|r| r.fips.as_str()).collect::<FxHashSet<_>>().len(),
            with_deaths: rows.iter().filter(|r| r.drug_deaths.is_some()).count(),
            with_shipments: rows.iter().filter(|r| r.opioid_shipments_mme.is_some()).count(),
            imputed_deaths: rows.iter().filter(|r| r.death_imputed).count(),
        }
    }
}

fn index_unique<'a, T>(
    source: &str,
    rows: &'a [T],
    key: impl Fn(&T) -> (&str, i32),
) -> Result<FxHashMap<(&'a str, i32), &'a T>> {
    let mut index = FxHashMap::default();
    for row in rows {
        let (fips, year) = key(row);
        if index.insert((fips, year), row).is_some() {
            return Err(StudyError::validation(format!(
                "{source}: duplicate county-year {fips}/{year}"
            )));
        }
    }
    Ok(index)
}

/// Builder for the merged county-year panel
#[derive(Debug, Default)]
pub struct PanelBuilder {
    population: Vec<PopulationRecord>,
    deaths: Vec<MortalityRecord>,
    shipments: Vec<ArcosCountyYear>,
}

impl PanelBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_population(mut self, population: Vec<PopulationRecord>) -> Self {
        self.population = population;
        self
    }

    #[must_use]
    pub fn with_deaths(mut self, deaths: Vec<MortalityRecord>) -> Self {
        self.deaths = deaths;
        self
    }

    #[must_use]
    pub fn with_shipments(mut self, shipments: Vec<ArcosCountyYear>) -> Self {
        self.shipments = shipments;
        self
    }

    /// Left-join deaths and shipments onto the population grid
    pub fn build(self) -> Result<Vec<CountyYear>> {
        if self.population.is_empty() {
            return Err(StudyError::validation("population table is empty"));
        }
        index_unique("population", &self.population, |r| (r.fips.as_str(), r.year))?;
        let deaths = index_unique("deaths", &self.deaths, |r| (r.fips.as_str(), r.year))?;
        let shipments =
            index_unique("shipments", &self.shipments, |r| (r.fips.as_str(), r.year))?;

        let mut panel: Vec<CountyYear> = self
            .population
            .iter()
            .map(|p| {
                let key = (p.fips.as_str(), p.year);
                let death = deaths.get(&key);
                let ship = shipments.get(&key);
                let mut row = CountyYear {
                    fips: p.fips.clone(),
                    year: p.year,
                    state_abbrev: p.state_abbrev.clone(),
                    county_name: p.county_name.clone(),
                    population: p.population,
                    drug_deaths: death.and_then(|d| d.drug_deaths),
                    death_imputed: death.is_some_and(|d| d.death_imputed),
                    opioid_shipments_mme: ship.map(|s| s.opioid_shipments_mme),
                    total_pills: ship.and_then(|s| s.total_pills),
                    drug_death_rate_per_100k: None,
                    mme_per_100k: None,
                    is_pre: None,
                };
                row.refresh_rates();
                row
            })
            .collect();
        panel.sort_by(|a, b| a.fips.cmp(&b.fips).then(a.year.cmp(&b.year)));

        let diag = PanelDiagnostics::of(&panel);
        log::info!("Merged panel created: {} rows, {} counties", diag.rows, diag.counties);
        log::info!("  Non-missing drug_deaths: {}", diag.with_deaths);
        log::info!("  Non-missing opioid_shipments_mme: {}", diag.with_shipments);
        if diag.imputed_deaths > 0 {
            log::info!("  Imputed drug_deaths: {}", diag.imputed_deaths);
        }
        Ok(panel)
    }
}

/// Restrict the panel to one case and keep only counties with complete mortality
///
/// Any county missing `drug_deaths` in any year is dropped entirely. Returns
/// the analysis panel and the number of counties dropped.
#[must_use]
pub fn analysis_panel(panel: &[CountyYear], case: &PolicyCase) -> (Vec<CountyYear>, usize) {
    let states: FxHashSet<String> = case.states().into_iter().collect();
    let in_case = || panel.iter().filter(|r| states.contains(&r.state_abbrev));

    let incomplete: BTreeSet<&str> = in_case()
        .filter(|r| r.drug_deaths.is_none())
        .map(|r| r.fips.as_str())
        .collect();

    let rows: Vec<CountyYear> = in_case()
        .filter(|r| !incomplete.contains(r.fips.as_str()))
        .map(|r| CountyYear {
            is_pre: Some(r.year < case.policy_year),
            ..r.clone()
        })
        .collect();

    log::info!(
        "{}: {} counties dropped for missing drug_deaths in any year; {} rows remain",
        case.name,
        incomplete.len(),
        rows.len()
    );
    if !rows.iter().any(|r| r.state_abbrev == case.policy_state) {
        log::warn!("{}: no {} counties left in the panel", case.name, case.policy_state);
    }
    (rows, incomplete.len())
}

/// Read the three processed inputs concurrently
pub async fn load_inputs(
    config: &StudyConfig,
) -> Result<(Vec<PopulationRecord>, Vec<MortalityRecord>, Vec<ArcosCountyYear>)> {
    futures::try_join!(
        read_records_async::<PopulationRecord>(config.population_path()),
        read_records_async::<MortalityRecord>(config.deaths_path()),
        read_records_async::<ArcosCountyYear>(config.shipments_path()),
    )
}

/// Build the merged panel and every case panel, writing them to disk
pub async fn build_and_save(config: &StudyConfig) -> Result<Vec<(PolicyCase, Vec<CountyYear>)>> {
    log_section("BUILDING COUNTY-YEAR PANEL");
    let start = Instant::now();

    let (population, deaths, shipments) = load_inputs(config).await?;
    let population: Vec<_> = population
        .into_iter()
        .filter(|p| config.years().contains(&p.year))
        .collect();

    let panel = PanelBuilder::new()
        .with_population(population)
        .with_deaths(deaths)
        .with_shipments(shipments)
        .build()?;
    write_records(&config.panel_path(), &panel)?;

    let mut cases = Vec::with_capacity(config.cases.len());
    for case in &config.cases {
        let (rows, _) = analysis_panel(&panel, case);
        write_records(&config.case_panel_path(case), &rows)?;
        cases.push((case.clone(), rows));
    }

    log::info!("Panels built in {:?}", start.elapsed());
    Ok(cases)
}
