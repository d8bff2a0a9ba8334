//! CDC WONDER drug-overdose mortality counts
//!
//! WONDER withholds counts below 10 and marks them `Suppressed`. Exports end
//! with a block of notes, which have no county code.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::algorithm::regression::line_fit;
use crate::config::SuppressionPolicy;
use crate::error::{Result, StudyError};
use crate::models::{MortalityRecord, PopulationRecord};
use crate::utils::fips::normalize_fips;
use crate::utils::logging::log_operation_start;

/// Largest count CDC suppresses
pub const SUPPRESSION_CEILING: f64 = 9.0;

/// A parsed `Deaths` cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeathCount {
    Count(f64),
    Suppressed,
    Missing,
}

impl DeathCount {
    #[must_use]
    pub fn parse(cell: &str) -> Self {
        let cell = cell.trim();
        if cell.eq_ignore_ascii_case("suppressed") {
            return Self::Suppressed;
        }
        cell.replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map_or(Self::Missing, Self::Count)
    }
}

#[derive(Debug, Deserialize)]
struct WonderRow {
    #[serde(rename = "County Code", default)]
    county_code: Option<String>,
    #[serde(rename = "Year", default)]
    year: Option<String>,
    #[serde(rename = "Deaths", default)]
    deaths: Option<String>,
}

fn parse_year(cell: &str) -> Option<i32> {
    cell.trim().get(..4)?.parse().ok()
}

/// Read a WONDER export (comma or tab separated)
///
/// Several rows for the same county-year, e.g. one per cause code, are
/// summed. A suppressed component makes the whole county-year suppressed.
pub fn read_mortality_csv(path: &Path) -> Result<Vec<MortalityRecord>> {
    log_operation_start("Reading mortality counts from", path);
    let delimiter = if path.extension().is_some_and(|e| e == "txt" || e == "tsv") {
        b'\t'
    } else {
        b','
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut totals: FxHashMap<(String, i32), DeathCount> = FxHashMap::default();
    let mut skipped = 0usize;
    for row in reader.deserialize::<WonderRow>() {
        let row = row?;
        let (Some(code), Some(year)) = (
            row.county_code.as_deref().filter(|c| !c.is_empty()),
            row.year.as_deref().and_then(parse_year),
        ) else {
            skipped += 1;
            continue;
        };
        let fips = normalize_fips(code)?;
        let count = row
            .deaths
            .as_deref()
            .map_or(DeathCount::Missing, DeathCount::parse);

        totals
            .entry((fips, year))
            .and_modify(|acc| *acc = combine(*acc, count))
            .or_insert(count);
    }
    if skipped > 0 {
        log::debug!("Skipped {skipped} note or total lines in {}", path.display());
    }

    let mut records: Vec<MortalityRecord> = totals
        .into_iter()
        .map(|((fips, year), count)| MortalityRecord {
            fips,
            year,
            drug_deaths: match count {
                DeathCount::Count(v) => Some(v),
                _ => None,
            },
            suppressed: count == DeathCount::Suppressed,
            death_imputed: false,
        })
        .collect();
    records.sort_by(|a, b| a.fips.cmp(&b.fips).then(a.year.cmp(&b.year)));

    let suppressed = records.iter().filter(|r| r.suppressed).count();
    log::info!(
        "Mortality: {} county-years, {} suppressed, {} missing",
        records.len(),
        suppressed,
        records.iter().filter(|r| r.drug_deaths.is_none()).count() - suppressed
    );
    Ok(records)
}

fn combine(a: DeathCount, b: DeathCount) -> DeathCount {
    match (a, b) {
        (DeathCount::Suppressed, _) | (_, DeathCount::Suppressed) => DeathCount::Suppressed,
        (DeathCount::Count(x), DeathCount::Count(y)) => DeathCount::Count(x + y),
        (DeathCount::Count(x), DeathCount::Missing) | (DeathCount::Missing, DeathCount::Count(x)) => {
            DeathCount::Count(x)
        }
        (DeathCount::Missing, DeathCount::Missing) => DeathCount::Missing,
    }
}

/// Apply the configured treatment of suppressed counts
///
/// With [`SuppressionPolicy::Impute`], fits `deaths ~ population` on observed
/// county-years and fills suppressed ones with the prediction clamped to
/// `[0, 9]`. Returns the number of imputed records.
pub fn apply_suppression_policy(
    records: &mut [MortalityRecord],
    populations: &[PopulationRecord],
    policy: SuppressionPolicy,
) -> Result<usize> {
    if policy == SuppressionPolicy::Missing {
        return Ok(0);
    }

    let pop: FxHashMap<(String, i32), f64> = populations
        .iter()
        .map(|p| ((p.fips.clone(), p.year), p.population))
        .collect();

    let (xs, ys): (Vec<f64>, Vec<f64>) = records
        .iter()
        .filter(|r| !r.suppressed)
        .filter_map(|r| Some((*pop.get(&(r.fips.clone(), r.year))?, r.drug_deaths?)))
        .unzip();
    let line = line_fit(&xs, &ys).ok_or_else(|| {
        StudyError::validation("not enough observed death counts to impute suppressed values")
    })?;
    log::info!(
        "Imputing suppressed deaths: deaths = {:.4} + {:.6} * population (R² = {:.2})",
        line.intercept,
        line.slope,
        line.r_squared
    );

    let mut imputed = 0usize;
    for record in records.iter_mut().filter(|r| r.suppressed) {
        let Some(&population) = pop.get(&(record.fips.clone(), record.year)) else {
            continue;
        };
        record.drug_deaths = Some(line.predict(population).clamp(0.0, SUPPRESSION_CEILING));
        record.death_imputed = true;
        imputed += 1;
    }
    log::info!("Imputed {imputed} suppressed county-years");
    Ok(imputed)
}
