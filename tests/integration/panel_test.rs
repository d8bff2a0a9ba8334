use opioid_did::algorithm::panel::{PanelBuilder, analysis_panel, build_and_save};
use opioid_did::models::{ArcosCountyYear, CountyYear, MortalityRecord, PopulationRecord};
use opioid_did::utils::io::{read_records, write_records};
use opioid_did::{PolicyCase, StudyError};

use crate::utils::{case_counties, config_in, temp_dir};

/// Processed inputs for the Florida case plus one Texas county outside it
///
/// Deaths of the first GA county are suppressed in 2013; shipments are
/// missing for 2006.
fn processed_inputs() -> (Vec<PopulationRecord>, Vec<MortalityRecord>, Vec<ArcosCountyYear>) {
    let mut counties = case_counties(&PolicyCase::florida());
    counties.push(("48001".to_string(), "TX".to_string()));
    let suppressed_county = counties
        .iter()
        .find(|(_, state)| state == "GA")
        .map(|(fips, _)| fips.clone())
        .unwrap();

    let mut population = Vec::new();
    let mut deaths = Vec::new();
    let mut shipments = Vec::new();
    for (i, (fips, state)) in counties.iter().enumerate() {
        for year in 2006..=2015 {
            population.push(PopulationRecord {
                fips: fips.clone(),
                year,
                state_abbrev: state.clone(),
                county_name: Some(format!("County {i}")),
                population: 10_000.0 * (i + 1) as f64,
            });
            let suppressed = *fips == suppressed_county && year == 2013;
            deaths.push(MortalityRecord {
                fips: fips.clone(),
                year,
                drug_deaths: (!suppressed).then_some(12.0 + i as f64),
                suppressed,
                death_imputed: false,
            });
            if year > 2006 {
                shipments.push(ArcosCountyYear {
                    fips: fips.clone(),
                    year,
                    opioid_shipments_mme: 1e6 * (i + 1) as f64,
                    total_pills: Some(5e4),
                });
            }
        }
    }
    (population, deaths, shipments)
}

#[test]
fn merged_panel_keeps_population_grid_and_computes_rates() {
    let (population, deaths, shipments) = processed_inputs();
    let n = population.len();
    let panel = PanelBuilder::new()
        .with_population(population)
        .with_deaths(deaths)
        .with_shipments(shipments)
        .build()
        .unwrap();

    assert_eq!(panel.len(), n);
    assert_eq!(panel.iter().filter(|r| r.drug_deaths.is_none()).count(), 1);
    assert_eq!(panel.iter().filter(|r| r.opioid_shipments_mme.is_none()).count(), n / 10);

    let first = &panel[0];
    assert_eq!(first.year, 2006);
    assert_eq!(first.mme_per_100k, None);
    let rate = first.drug_death_rate_per_100k.unwrap();
    let expected = first.drug_deaths.unwrap() / first.population * 100_000.0;
    assert!((rate - expected).abs() < 1e-9);
}

#[test]
fn analysis_panel_drops_incomplete_county_everywhere() {
    let (population, deaths, shipments) = processed_inputs();
    let panel = PanelBuilder::new()
        .with_population(population)
        .with_deaths(deaths)
        .with_shipments(shipments)
        .build()
        .unwrap();

    let case = PolicyCase::florida();
    let (clean, dropped) = analysis_panel(&panel, &case);
    assert_eq!(dropped, 1);
    // 8 FL + 24 control counties, minus the suppressed one; TX is not in the case
    assert_eq!(clean.len(), 31 * 10);
    assert!(clean.iter().all(|r| r.drug_deaths.is_some()));
    assert!(clean.iter().all(|r| r.state_abbrev != "TX"));
    assert!(
        clean
            .iter()
            .all(|r| r.is_pre == Some(r.year < case.policy_year))
    );
}

#[test]
fn duplicate_inputs_are_rejected() {
    let (population, mut deaths, _) = processed_inputs();
    deaths.push(deaths[0].clone());
    let err = PanelBuilder::new()
        .with_population(population)
        .with_deaths(deaths)
        .build()
        .unwrap_err();
    assert!(matches!(err, StudyError::Validation(_)));
}

#[test]
fn panel_survives_parquet_storage() {
    let (population, deaths, shipments) = processed_inputs();
    let panel = PanelBuilder::new()
        .with_population(population)
        .with_deaths(deaths)
        .with_shipments(shipments)
        .build()
        .unwrap();
    let (clean, _) = analysis_panel(&panel, &PolicyCase::florida());

    let path = temp_dir("panel-parquet").join("fl_panel_clean.parquet");
    write_records(&path, &clean).unwrap();
    let back: Vec<CountyYear> = read_records(&path).unwrap();
    assert_eq!(back, clean);
    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn build_and_save_writes_every_case_panel() {
    let dir = temp_dir("build-panel");
    let config = config_in(&dir);
    let (population, deaths, shipments) = processed_inputs();
    write_records(&config.population_path(), &population).unwrap();
    write_records(&config.deaths_path(), &deaths).unwrap();
    write_records(&config.shipments_path(), &shipments).unwrap();

    let cases = build_and_save(&config).await.unwrap();
    assert_eq!(cases.len(), 2);

    let (fl, fl_rows) = &cases[0];
    assert_eq!(fl.policy_state, "FL");
    assert_eq!(fl_rows.len(), 31 * 10);
    let stored: Vec<CountyYear> = read_records(&config.case_panel_path(fl)).unwrap();
    assert_eq!(stored.len(), fl_rows.len());

    // no Washington-case counties in the inputs
    let (wa, wa_rows) = &cases[1];
    assert_eq!(wa.policy_state, "WA");
    assert!(wa_rows.is_empty());

    let full: Vec<CountyYear> = read_records(&config.panel_path()).unwrap();
    assert_eq!(full.len(), population.len());
    std::fs::remove_dir_all(&dir).ok();
}
