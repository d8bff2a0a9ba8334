use opioid_did::PolicyCase;
use opioid_did::algorithm::did::{OutcomeSample, levels_model, run_case, trends_model};
use opioid_did::models::Outcome;

use crate::utils::{level_shift_panel, noise, synthetic_panel};

#[test]
fn levels_model_recovers_policy_effect() {
    let case = PolicyCase::florida();
    let panel = level_shift_panel(&case, 5.0, -3e6);

    let estimates = run_case(&panel, &case);
    assert_eq!(estimates.len(), 2);

    let deaths = estimates
        .iter()
        .find(|e| e.outcome == Outcome::DeathRatePer100k)
        .unwrap();
    let level = deaths.level.as_ref().unwrap();
    assert!((level.coef - 5.0).abs() < 0.1, "coef {}", level.coef);
    assert!(level.p_value < 0.01);
    assert!(level.ci_lower < level.coef && level.coef < level.ci_upper);
    assert_eq!(deaths.n_obs, 32 * 10);
    assert_eq!(deaths.n_clusters, 32);
    assert!(deaths.r_squared.unwrap() > 0.9);

    let shipments = estimates
        .iter()
        .find(|e| e.outcome == Outcome::MmePer100k)
        .unwrap();
    let level = shipments.level.as_ref().unwrap();
    assert!((level.coef + 3e6).abs() < 1e4, "coef {}", level.coef);
}

#[test]
fn post_is_absorbed_by_year_effects() {
    let case = PolicyCase::florida();
    let panel = level_shift_panel(&case, 5.0, 0.0);
    let sample = OutcomeSample::new(&panel, Outcome::DeathRatePer100k);

    let fit = levels_model(&sample, "FL", 2010).unwrap();
    assert_eq!(fit.dropped, vec!["post".to_string()]);
    assert!(fit.coefficient("post").is_err());
    // counties + years - 1 connected component + post:treated
    assert_eq!(fit.df_model, 32 + 10 - 1 + 1);
}

#[test]
fn trends_model_recovers_slope_change() {
    let case = PolicyCase::florida();
    let panel = synthetic_panel(&case, |i, treated, year| {
        let year_c = f64::from(year - 2010);
        let treated_post = if treated && year >= 2010 { 1.0 } else { 0.0 };
        let death = 10.0 + i as f64
            + 0.5 * year_c
            + 2.0 * year_c * treated_post
            + 1.5 * treated_post
            + noise(i, year);
        (death, 1e6 + 1e4 * i as f64)
    });
    let sample = OutcomeSample::new(&panel, Outcome::DeathRatePer100k);

    let fit = trends_model(&sample, "FL", 2010).unwrap();
    assert!(fit.dropped.is_empty());
    let slope = fit.coefficient("post:year_c:treated").unwrap();
    assert!((slope.coef - 2.0).abs() < 0.1, "slope {}", slope.coef);
    assert!(slope.p_value < 1e-6);
    let shift = fit.coefficient("post:treated").unwrap();
    assert!((shift.coef - 1.5).abs() < 0.3, "shift {}", shift.coef);
    assert!((fit.coefficient("year_c").unwrap().coef - 0.5).abs() < 0.05);
}

#[test]
fn failing_outcome_leaves_fields_empty() {
    let case = PolicyCase::washington();
    let mut panel = level_shift_panel(&case, 2.0, 1e6);
    for row in &mut panel {
        row.opioid_shipments_mme = None;
        row.mme_per_100k = None;
    }

    let estimates = run_case(&panel, &case);
    let shipments = estimates
        .iter()
        .find(|e| e.outcome == Outcome::MmePer100k)
        .unwrap();
    assert!(shipments.level.is_none());
    assert!(shipments.slope_change.is_none());
    assert_eq!(shipments.n_obs, 0);

    let deaths = estimates
        .iter()
        .find(|e| e.outcome == Outcome::DeathRatePer100k)
        .unwrap();
    assert!((deaths.level.as_ref().unwrap().coef - 2.0).abs() < 0.1);
}
