//! Census county population estimates
//!
//! The estimate files are wide (one `POPESTIMATE<year>` column per year) and
//! Latin-1 encoded, so rows are read as bytes and decoded lossily.

use std::ops::RangeInclusive;
use std::path::Path;

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::error::{Result, StudyError};
use crate::ingest::states::state_abbrev;
use crate::models::PopulationRecord;
use crate::utils::fips::compose_fips;
use crate::utils::logging::{FileOp, log_operation_complete, log_operation_start};

fn column(headers: &csv::ByteRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| String::from_utf8_lossy(h).trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            StudyError::schema(format!("column {name} missing from {}", path.display()))
        })
}

fn text(record: &csv::ByteRecord, idx: usize) -> String {
    record
        .get(idx)
        .map(|b| String::from_utf8_lossy(b).trim().to_string())
        .unwrap_or_default()
}

/// Read one wide estimate file into long county-year records
///
/// Only years in `years` that the file carries are returned. State total
/// rows (`COUNTY == 0`) are skipped.
pub fn read_census_csv(path: &Path, years: RangeInclusive<i32>) -> Result<Vec<PopulationRecord>> {
    log_operation_start("Reading population estimates from", path);
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.byte_headers()?.clone();

    let state_idx = column(&headers, "STATE", path)?;
    let county_idx = column(&headers, "COUNTY", path)?;
    let stname_idx = column(&headers, "STNAME", path)?;
    let ctyname_idx = column(&headers, "CTYNAME", path)?;
    let year_cols: Vec<(i32, usize)> = years
        .filter_map(|y| {
            column(&headers, &format!("POPESTIMATE{y}"), path)
                .ok()
                .map(|idx| (y, idx))
        })
        .collect();
    if year_cols.is_empty() {
        return Err(StudyError::schema(format!(
            "no POPESTIMATE columns for the study years in {}",
            path.display()
        )));
    }

    let mut records = Vec::new();
    let mut record = csv::ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        let county_code: u32 = text(&record, county_idx).parse().map_err(|_| {
            StudyError::validation(format!("bad COUNTY code in {}", path.display()))
        })?;
        if county_code == 0 {
            continue;
        }
        let state_code: u32 = text(&record, state_idx).parse().map_err(|_| {
            StudyError::validation(format!("bad STATE code in {}", path.display()))
        })?;
        let state_name = text(&record, stname_idx);
        let abbrev = state_abbrev(&state_name).ok_or_else(|| {
            StudyError::validation(format!("unknown state name '{state_name}'"))
        })?;
        let fips = compose_fips(state_code, county_code)?;
        let county_name = Some(text(&record, ctyname_idx)).filter(|n| !n.is_empty());

        for &(year, idx) in &year_cols {
            let raw = text(&record, idx);
            let Ok(population) = raw.parse::<f64>() else {
                log::warn!("{fips} {year}: unreadable population '{raw}'");
                continue;
            };
            records.push(PopulationRecord {
                fips: fips.clone(),
                year,
                state_abbrev: abbrev.to_string(),
                county_name: county_name.clone(),
                population,
            });
        }
    }

    log_operation_complete(FileOp::Read, path, records.len(), None);
    Ok(records)
}

/// Combine estimate files; a later file replaces earlier county-years
#[must_use]
pub fn merge_population(sources: Vec<Vec<PopulationRecord>>) -> Vec<PopulationRecord> {
    let mut merged: FxHashMap<(String, i32), PopulationRecord> = FxHashMap::default();
    for record in sources.into_iter().flatten() {
        merged.insert((record.fips.clone(), record.year), record);
    }
    merged
        .into_values()
        .sorted_by(|a, b| a.fips.cmp(&b.fips).then(a.year.cmp(&b.year)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(name: &str, body: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("opioid-did-census-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn reshapes_wide_estimates() {
        let path = write(
            "wide.csv",
            "SUMLEV,REGION,DIVISION,STATE,COUNTY,STNAME,CTYNAME,POPESTIMATE2005,POPESTIMATE2006,POPESTIMATE2007\n\
             040,3,6,1,0,Alabama,Alabama,4500000,4600000,4700000\n\
             050,3,6,1,1,Alabama,Autauga County,50000,51000,52000\n\
             050,3,5,12,3,Florida,Baker County,25000,26000,27000\n",
        );
        let records = read_census_csv(&path, 2006..=2015).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].fips, "01001");
        assert_eq!(records[0].year, 2006);
        assert_eq!(records[0].population, 51000.0);
        assert_eq!(records[3].fips, "12003");
        assert_eq!(records[3].state_abbrev, "FL");
        assert_eq!(records[3].county_name.as_deref(), Some("Baker County"));
    }

    #[test]
    fn rejects_files_without_study_years() {
        let path = write(
            "old.csv",
            "STATE,COUNTY,STNAME,CTYNAME,POPESTIMATE1999\n1,1,Alabama,Autauga County,40000\n",
        );
        assert!(matches!(
            read_census_csv(&path, 2006..=2015),
            Err(StudyError::Schema(_))
        ));
    }

    #[test]
    fn unknown_state_name_is_an_error() {
        let path = write(
            "territory.csv",
            "STATE,COUNTY,STNAME,CTYNAME,POPESTIMATE2010\n\
             72,1,Puerto Rico,Adjuntas Municipio,19000\n",
        );
        match read_census_csv(&path, 2006..=2015) {
            Err(StudyError::Validation(msg)) => assert!(msg.contains("Puerto Rico"), "{msg}"),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn later_sources_win() {
        let rec = |pop: f64| PopulationRecord {
            fips: "12003".into(),
            year: 2010,
            state_abbrev: "FL".into(),
            county_name: None,
            population: pop,
        };
        let merged = merge_population(vec![vec![rec(1.0)], vec![rec(2.0)]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].population, 2.0);
    }
}
