//! Sensitivity analyses around the main DiD estimate
//!
//! Every check re-estimates `y ~ treated_post + C(fips) + C(year)` with
//! county-clustered errors on a modified sample and turns the resulting
//! p-values or coefficients into a [`Conclusion`].

use rustc_hash::FxHashSet;

use crate::algorithm::did::sample::{OutcomeSample, two_way_did};
use crate::config::{PolicyCase, RobustnessConfig};
use crate::error::{Result, StudyError};
use crate::models::{
    Conclusion, CountyYear, Outcome, RobustnessCheck, RobustnessResult, VariantEstimate,
};

const TERM: &str = "treated_post";

/// Fit one variant on `rows` and keep the `treated_post` estimate
fn variant<'a>(
    name: &str,
    rows: impl IntoIterator<Item = &'a CountyYear>,
    outcome: Outcome,
    treated_state: &str,
    policy_year: i32,
    weighted: bool,
) -> Result<VariantEstimate> {
    let sample = OutcomeSample::new(rows, outcome);
    let fit = two_way_did(&sample, treated_state, policy_year, weighted)?;
    Ok(VariantEstimate {
        variant: name.to_string(),
        outcome,
        estimate: fit.coefficient(TERM)?.clone(),
        n_obs: fit.n_obs,
    })
}

/// Full controls vs a reduced control set, on shipments
pub fn alternative_controls(
    panel: &[CountyYear],
    case: &PolicyCase,
    settings: &RobustnessConfig,
) -> Result<RobustnessResult> {
    let state = case.policy_state.as_str();
    let subset: FxHashSet<&str> = settings
        .subset_controls
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(state))
        .collect();

    let full = variant("all controls", panel, Outcome::MmePer100k, state, case.policy_year, false)?;
    let reduced = variant(
        &format!("{} controls", settings.subset_controls.join("/")),
        panel.iter().filter(|r| subset.contains(r.state_abbrev.as_str())),
        Outcome::MmePer100k,
        state,
        case.policy_year,
        false,
    )?;

    let gap = (full.estimate.coef - reduced.estimate.coef).abs();
    let conclusion = if gap < settings.consistency_threshold {
        Conclusion::Consistent
    } else {
        Conclusion::Sensitive
    };
    log::info!("Alternative controls: coefficient gap {gap:.1} -> {conclusion:?}");

    Ok(RobustnessResult {
        check: RobustnessCheck::AlternativeControls,
        state: case.policy_state.clone(),
        variants: vec![full, reduced],
        conclusion,
    })
}

/// Unweighted vs population-weighted death-rate regression
pub fn population_weighting(
    panel: &[CountyYear],
    case: &PolicyCase,
    settings: &RobustnessConfig,
) -> Result<RobustnessResult> {
    let state = case.policy_state.as_str();
    let outcome = Outcome::DeathRatePer100k;
    let unweighted = variant("unweighted", panel, outcome, state, case.policy_year, false)?;
    let weighted = variant("population weighted", panel, outcome, state, case.policy_year, true)?;

    let conclusion = if weighted.estimate.p_value < settings.significance {
        Conclusion::Robust
    } else {
        Conclusion::Weakened
    };
    log::info!(
        "Population weighting: weighted p={:.3} -> {conclusion:?}",
        weighted.estimate.p_value
    );

    Ok(RobustnessResult {
        check: RobustnessCheck::PopulationWeighting,
        state: case.policy_state.clone(),
        variants: vec![unweighted, weighted],
        conclusion,
    })
}

/// Fake policy year inside the pre-period; no effect should appear
pub fn placebo(
    panel: &[CountyYear],
    case: &PolicyCase,
    settings: &RobustnessConfig,
) -> Result<RobustnessResult> {
    if settings.placebo_last_year >= case.policy_year {
        return Err(StudyError::Config(format!(
            "placebo window ends in {} but the policy starts in {}",
            settings.placebo_last_year, case.policy_year
        )));
    }
    let state = case.policy_state.as_str();
    let name = format!("placebo {}", settings.placebo_year);
    let pre = || panel.iter().filter(|r| r.year <= settings.placebo_last_year);

    let variants = Outcome::ALL
        .iter()
        .map(|&outcome| variant(&name, pre(), outcome, state, settings.placebo_year, false))
        .collect::<Result<Vec<_>>>()?;

    let conclusion = if variants
        .iter()
        .all(|v| v.estimate.p_value > settings.placebo_significance)
    {
        Conclusion::Passes
    } else {
        Conclusion::Fails
    };
    log::info!("Placebo test ({}): {conclusion:?}", settings.placebo_year);

    Ok(RobustnessResult {
        check: RobustnessCheck::Placebo,
        state: case.policy_state.clone(),
        variants,
        conclusion,
    })
}

/// Drop treated counties on the state border to rule out spillovers
pub fn border_exclusion(
    panel: &[CountyYear],
    case: &PolicyCase,
    settings: &RobustnessConfig,
) -> Result<RobustnessResult> {
    let state = case.policy_state.as_str();
    let border: FxHashSet<&str> = settings.border_counties.iter().map(String::as_str).collect();
    let interior = || panel.iter().filter(|r| !border.contains(r.fips.as_str()));

    let variants = Outcome::ALL
        .iter()
        .map(|&outcome| {
            variant("border counties excluded", interior(), outcome, state, case.policy_year, false)
        })
        .collect::<Result<Vec<_>>>()?;

    let conclusion = if variants
        .iter()
        .all(|v| v.estimate.p_value < settings.significance)
    {
        Conclusion::Robust
    } else {
        Conclusion::Weakened
    };
    log::info!(
        "Border exclusion ({} counties): {conclusion:?}",
        settings.border_counties.len()
    );

    Ok(RobustnessResult {
        check: RobustnessCheck::BorderExclusion,
        state: case.policy_state.clone(),
        variants,
        conclusion,
    })
}

/// Run every configured check; failing checks are logged and skipped
#[must_use]
pub fn run_checks(panel: &[CountyYear], case: &PolicyCase) -> Vec<RobustnessResult> {
    let Some(settings) = &case.robustness else {
        log::info!("{}: no robustness settings, skipping checks", case.name);
        return Vec::new();
    };

    type Check = fn(&[CountyYear], &PolicyCase, &RobustnessConfig) -> Result<RobustnessResult>;
    let checks: [(RobustnessCheck, Check); 4] = [
        (RobustnessCheck::AlternativeControls, alternative_controls),
        (RobustnessCheck::PopulationWeighting, population_weighting),
        (RobustnessCheck::Placebo, placebo),
        (RobustnessCheck::BorderExclusion, border_exclusion),
    ];

    checks
        .iter()
        .filter_map(|(kind, check)| match check(panel, case, settings) {
            Ok(result) => Some(result),
            Err(e) => {
                log::warn!("{} {} failed: {e}", case.policy_state, kind.title());
                None
            }
        })
        .collect()
}
