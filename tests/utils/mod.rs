use std::path::PathBuf;

use opioid_did::ingest::state_fips;
use opioid_did::models::{CountyYear, PER_CAPITA_SCALE};
use opioid_did::utils::compose_fips;
use opioid_did::{PolicyCase, StudyConfig};

/// Florida counties used for the treated group; the first two border GA/AL
pub const FLORIDA_COUNTIES: [&str; 8] = [
    "12003", "12031", "12011", "12086", "12095", "12099", "12057", "12103",
];

pub const COUNTIES_PER_STATE: usize = 4;

/// Scratch directory unique to this test process and `name`
#[must_use]
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("opioid-did-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Config with every directory inside `dir`
#[must_use]
pub fn config_in(dir: &std::path::Path) -> StudyConfig {
    StudyConfig {
        raw_dir: dir.join("raw"),
        processed_dir: dir.join("processed"),
        tables_dir: dir.join("tables"),
        threads: 2,
        ..StudyConfig::default()
    }
}

/// Deterministic disturbance in [-0.5, 0.5], not additive in county and year
#[must_use]
pub fn noise(county: usize, year: i32) -> f64 {
    ((county * 31 + year as usize * 17) % 11) as f64 / 10.0 - 0.5
}

/// Counties of a case: treated counties first, then each control state
#[must_use]
pub fn case_counties(case: &PolicyCase) -> Vec<(String, String)> {
    let mut counties = Vec::new();
    if case.policy_state == "FL" {
        counties.extend(FLORIDA_COUNTIES.iter().map(|f| ((*f).to_string(), "FL".to_string())));
    } else {
        counties.extend(state_counties(&case.policy_state, 2 * COUNTIES_PER_STATE));
    }
    for state in &case.control_states {
        counties.extend(state_counties(state, COUNTIES_PER_STATE));
    }
    counties
}

fn state_counties(state: &str, n: usize) -> Vec<(String, String)> {
    let code = state_fips(state).unwrap();
    (0..n)
        .map(|k| (compose_fips(code, 2 * k as u32 + 1).unwrap(), state.to_string()))
        .collect()
}

/// Balanced panel over 2006-2015 for `case`
///
/// `outcomes(county_index, treated, year)` returns the death rate and the
/// MME rate per 100k; counts are derived from them.
pub fn synthetic_panel(
    case: &PolicyCase,
    outcomes: impl Fn(usize, bool, i32) -> (f64, f64),
) -> Vec<CountyYear> {
    let mut rows = Vec::new();
    for (index, (fips, state)) in case_counties(case).into_iter().enumerate() {
        let population = 20_000.0 + 5_000.0 * index as f64;
        let treated = state == case.policy_state;
        for year in 2006..=2015 {
            let (death_rate, mme_rate) = outcomes(index, treated, year);
            rows.push(CountyYear {
                fips: fips.clone(),
                year,
                state_abbrev: state.clone(),
                county_name: None,
                population,
                drug_deaths: Some(death_rate * population / PER_CAPITA_SCALE),
                death_imputed: false,
                opioid_shipments_mme: Some(mme_rate * population / PER_CAPITA_SCALE),
                total_pills: None,
                drug_death_rate_per_100k: Some(death_rate),
                mme_per_100k: Some(mme_rate),
                is_pre: Some(year < case.policy_year),
            });
        }
    }
    rows
}

/// Level effect of `death_effect` on deaths and `mme_effect` on shipments
/// from the policy year on, with non-linear common year effects
pub fn level_shift_panel(case: &PolicyCase, death_effect: f64, mme_effect: f64) -> Vec<CountyYear> {
    let policy_year = case.policy_year;
    synthetic_panel(case, move |i, treated, year| {
        let treated_post = if treated && year >= policy_year { 1.0 } else { 0.0 };
        let year_effect = f64::from((year - 2006) % 3) + 0.2 * f64::from(year - 2006);
        let death = 10.0 + i as f64 + year_effect + death_effect * treated_post + noise(i, year);
        let mme = 5e7 + 1e6 * i as f64 + 2e5 * year_effect + mme_effect * treated_post
            + 1e5 * noise(i, year);
        (death, mme)
    })
}
