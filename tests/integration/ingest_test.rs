use opioid_did::ingest::{Crosswalk, aggregate_arcos_file};
use opioid_did::models::{ArcosCountyYear, CrosswalkRow, MortalityRecord, PopulationRecord};
use opioid_did::utils::io::read_records;
use opioid_did::{StudyConfig, SuppressionPolicy, ingest_raw_sources};

use crate::utils::{config_in, temp_dir};

const ARCOS_HEADER: &str =
    "BUYER_STATE,BUYER_COUNTY,TRANSACTION_DATE,CALC_BASE_WT_IN_GM,MME_Conversion_Factor,DOSAGE_UNIT\n";

/// Duval and Baker counties in two Census vintages, WONDER deaths with one
/// suppressed county-year, and six ARCOS lines of which two are usable
fn write_raw_sources(config: &StudyConfig) {
    let raw = &config.raw_dir;
    std::fs::create_dir_all(raw).unwrap();
    let write = |name: &String, body: &str| std::fs::write(raw.join(name), body).unwrap();

    write(
        &config.raw.census_population[0],
        "STATE,COUNTY,STNAME,CTYNAME,POPESTIMATE2009,POPESTIMATE2010\n\
         12,0,Florida,Florida,18500000,18800000\n\
         12,31,Florida,Duval County,800000,805000\n\
         12,3,Florida,Baker County,26000,27000\n",
    );
    write(
        &config.raw.census_population[1],
        "STATE,COUNTY,STNAME,CTYNAME,POPESTIMATE2010,POPESTIMATE2011\n\
         12,31,Florida,Duval County,811000,815000\n",
    );
    write(
        &config.raw.mortality,
        "Notes,County,County Code,Year,Year Code,Deaths\n\
         ,\"Duval County, FL\",12031,2003,2003,90\n\
         ,\"Duval County, FL\",12031,2009,2009,120\n\
         ,\"Duval County, FL\",12031,2010,2010,130\n\
         ,\"Baker County, FL\",12003,2010,2010,Suppressed\n\
         Total,,,,,340\n",
    );
    write(
        &config.raw.county_crosswalk,
        "state,county,fips\nFL,Duval County,12031\nFL,Baker,12003\n",
    );
    write(
        &config.raw.arcos_transactions,
        &format!(
            "{ARCOS_HEADER}\
             FL,DUVAL,01152010,1.0,1.5,100\n\
             FL,DUVAL,02152010,abc,1.5,100\n\
             FL,BAKER,03012009,,1.0,10\n\
             FL,BAKER,03012009,0.2,1.0,10\n\
             FL,NOWHERE,03012009,0.2,1.0,10\n\
             FL,DUVAL,03012001,0.2,1.0,10\n"
        ),
    );
}

#[test]
fn raw_sources_become_processed_inputs() {
    let dir = temp_dir("ingest");
    let config = config_in(&dir);
    write_raw_sources(&config);

    let summary = ingest_raw_sources(&config).unwrap();
    assert_eq!(summary.population_rows, 5);
    // 2003 is outside the study years
    assert_eq!(summary.mortality_rows, 3);
    assert_eq!(summary.suppressed_rows, 1);
    assert_eq!(summary.imputed_rows, 0);
    assert_eq!(summary.shipment_rows, 2);
    assert_eq!(summary.arcos.rows_read, 6);
    assert_eq!(summary.arcos.rows_used, 2);
    assert_eq!(summary.arcos.dropped_unparsable, 2);
    assert_eq!(summary.arcos.dropped_unmatched, 1);
    assert_eq!(summary.arcos.dropped_out_of_window, 1);

    let population: Vec<PopulationRecord> = read_records(&config.population_path()).unwrap();
    let duval_2010 = population
        .iter()
        .find(|p| p.fips == "12031" && p.year == 2010)
        .unwrap();
    assert_eq!(duval_2010.population, 811_000.0);
    assert!(population.iter().all(|p| p.state_abbrev == "FL"));

    let deaths: Vec<MortalityRecord> = read_records(&config.deaths_path()).unwrap();
    let baker = deaths.iter().find(|d| d.fips == "12003").unwrap();
    assert!(baker.suppressed);
    assert_eq!(baker.drug_deaths, None);

    let shipments: Vec<ArcosCountyYear> = read_records(&config.shipments_path()).unwrap();
    let duval = shipments.iter().find(|s| s.fips == "12031").unwrap();
    assert_eq!(duval.year, 2010);
    assert!((duval.opioid_shipments_mme - 1500.0).abs() < 1e-9);
    assert_eq!(duval.total_pills, Some(100.0));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn imputation_fills_suppressed_counts_within_range() {
    let dir = temp_dir("ingest-impute");
    let mut config = config_in(&dir);
    config.suppression = SuppressionPolicy::Impute;
    write_raw_sources(&config);

    let summary = ingest_raw_sources(&config).unwrap();
    assert_eq!(summary.suppressed_rows, 1);
    assert_eq!(summary.imputed_rows, 1);

    let deaths: Vec<MortalityRecord> = read_records(&config.deaths_path()).unwrap();
    let baker = deaths.iter().find(|d| d.fips == "12003").unwrap();
    assert!(baker.death_imputed);
    let value = baker.drug_deaths.unwrap();
    assert!((0.0..=9.0).contains(&value), "imputed {value}");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn unreadable_arcos_numbers_are_counted_not_fatal() {
    let dir = temp_dir("arcos-file");
    let path = dir.join("arcos.csv");
    std::fs::write(
        &path,
        format!(
            "{ARCOS_HEADER}\
             FL,ST JOHNS,01152010,1.0,1.5,100\n\
             FL,ST JOHNS,01162010,n/a,1.5,100\n\
             FL,ST JOHNS,01172010,1.0,,100\n"
        ),
    )
    .unwrap();
    let crosswalk = Crosswalk::from_rows(vec![CrosswalkRow {
        state: "FL".into(),
        county: "St. Johns County".into(),
        fips: "12109".into(),
    }]);

    let (rows, summary) = aggregate_arcos_file(&path, &crosswalk, 2006..=2015).unwrap();
    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.dropped_unparsable, 2);
    assert_eq!(rows.len(), 1);
    assert!((rows[0].opioid_shipments_mme - 1500.0).abs() < 1e-9);

    std::fs::remove_dir_all(&dir).ok();
}
