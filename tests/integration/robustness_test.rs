use opioid_did::PolicyCase;
use opioid_did::algorithm::did::{
    alternative_controls, border_exclusion, placebo, population_weighting, run_checks,
};
use opioid_did::models::{Conclusion, Outcome, RobustnessCheck};

use crate::utils::level_shift_panel;

#[test]
fn strong_effect_survives_every_check_but_placebo_finds_nothing() {
    let case = PolicyCase::florida();
    let settings = case.robustness.clone().unwrap();
    let panel = level_shift_panel(&case, 5.0, -3e6);

    let alt = alternative_controls(&panel, &case, &settings).unwrap();
    assert_eq!(alt.conclusion, Conclusion::Consistent);
    assert_eq!(alt.variants.len(), 2);
    // FL plus GA, AL, SC with four counties each
    assert_eq!(alt.variants[1].n_obs, (8 + 3 * 4) * 10);

    let weighting = population_weighting(&panel, &case, &settings).unwrap();
    assert_eq!(weighting.conclusion, Conclusion::Robust);
    let weighted = &weighting.variants[1].estimate;
    assert!((weighted.coef - 5.0).abs() < 0.1, "weighted coef {}", weighted.coef);

    let border = border_exclusion(&panel, &case, &settings).unwrap();
    assert_eq!(border.conclusion, Conclusion::Robust);
    // two of the eight treated counties are on the border
    assert!(border.variants.iter().all(|v| v.n_obs == 30 * 10));

    let fake = placebo(&panel, &case, &settings).unwrap();
    assert_eq!(fake.conclusion, Conclusion::Passes);
    assert_eq!(fake.variants.len(), 2);
    let deaths = fake
        .variants
        .iter()
        .find(|v| v.outcome == Outcome::DeathRatePer100k)
        .unwrap();
    assert_eq!(deaths.n_obs, 32 * 4);
    assert!(deaths.estimate.coef.abs() < 0.2, "placebo coef {}", deaths.estimate.coef);
}

#[test]
fn sensitive_when_subset_changes_the_estimate() {
    let case = PolicyCase::florida();
    let mut settings = case.robustness.clone().unwrap();
    settings.consistency_threshold = 1.0;
    let panel = level_shift_panel(&case, 5.0, -3e6);

    let alt = alternative_controls(&panel, &case, &settings).unwrap();
    assert_eq!(alt.conclusion, Conclusion::Sensitive);
}

#[test]
fn null_effect_weakens_border_check() {
    let case = PolicyCase::florida();
    let settings = case.robustness.clone().unwrap();
    let panel = level_shift_panel(&case, 0.0, 0.0);

    let border = border_exclusion(&panel, &case, &settings).unwrap();
    assert_eq!(border.conclusion, Conclusion::Weakened);
}

#[test]
fn run_checks_covers_configured_cases_only() {
    let fl = PolicyCase::florida();
    let results = run_checks(&level_shift_panel(&fl, 5.0, -3e6), &fl);
    let kinds: Vec<_> = results.iter().map(|r| r.check).collect();
    assert_eq!(
        kinds,
        vec![
            RobustnessCheck::AlternativeControls,
            RobustnessCheck::PopulationWeighting,
            RobustnessCheck::Placebo,
            RobustnessCheck::BorderExclusion,
        ]
    );
    assert_eq!(results[0].rows().len(), 2);

    let wa = PolicyCase::washington();
    assert!(run_checks(&level_shift_panel(&wa, 1.0, 1.0), &wa).is_empty());
}
