//! Main DiD models: levels (Model 1) and trends (Model 2)

use rayon::prelude::*;

use crate::algorithm::did::sample::OutcomeSample;
use crate::algorithm::panel::{county_factor, label, year_factor};
use crate::algorithm::regression::{Design, Fit, fit};
use crate::config::PolicyCase;
use crate::error::Result;
use crate::models::{CountyYear, DidEstimate, Estimate, Outcome};

pub const LEVEL_TERM: &str = "post:treated";
pub const SLOPE_TERM: &str = "post:year_c:treated";

/// Model 1: `y ~ post + post:treated + C(fips) + C(year)`, clustered by county
///
/// `post` is collinear with the year effects and is dropped by the solver.
pub fn levels_model(sample: &OutcomeSample<'_>, treated_state: &str, policy_year: i32) -> Result<Fit> {
    let labels = label(&sample.rows, treated_state, policy_year);
    let counties = county_factor(&sample.rows);
    let design = Design::new(sample.outcome.column(), sample.y.clone())
        .regressor("post", labels.post.clone())
        .regressor(LEVEL_TERM, labels.post_treated())
        .absorb(counties.clone())
        .absorb(year_factor(&sample.rows))
        .cluster(counties);
    fit(&design)
}

/// Model 2: separate pre and post trends for treated and control counties
///
/// `y ~ year_c + year_c:treated + post + post:treated + post:year_c
///      + post:year_c:treated + C(fips)`, clustered by county.
pub fn trends_model(sample: &OutcomeSample<'_>, treated_state: &str, policy_year: i32) -> Result<Fit> {
    let labels = label(&sample.rows, treated_state, policy_year);
    let counties = county_factor(&sample.rows);
    let design = Design::new(sample.outcome.column(), sample.y.clone())
        .regressor("year_c", labels.year_c.clone())
        .regressor("year_c:treated", labels.year_c_treated())
        .regressor("post", labels.post.clone())
        .regressor(LEVEL_TERM, labels.post_treated())
        .regressor("post:year_c", labels.post_year_c())
        .regressor(SLOPE_TERM, labels.post_year_c_treated())
        .absorb(counties.clone())
        .cluster(counties);
    fit(&design)
}

fn term(fit: &Result<Fit>, name: &str) -> Option<Estimate> {
    fit.as_ref().ok().and_then(|f| f.coefficient(name).ok()).cloned()
}

/// Both models for one outcome; a failing model leaves its fields empty
#[must_use]
pub fn estimate_outcome(panel: &[CountyYear], case: &PolicyCase, outcome: Outcome) -> DidEstimate {
    let sample = OutcomeSample::new(panel, outcome);
    let state = &case.policy_state;

    let m1 = levels_model(&sample, state, case.policy_year);
    let m2 = trends_model(&sample, state, case.policy_year);
    for (model, result, wanted) in [("Model 1", &m1, LEVEL_TERM), ("Model 2", &m2, SLOPE_TERM)] {
        match result {
            Ok(f) => {
                if let Err(e) = f.coefficient(wanted) {
                    log::warn!("{state} {outcome} {model}: {e}");
                }
            }
            Err(e) => log::warn!("{state} {outcome} {model} failed: {e}"),
        }
    }

    let estimate = DidEstimate {
        state: state.clone(),
        outcome,
        level: term(&m1, LEVEL_TERM),
        slope_change: term(&m2, SLOPE_TERM),
        level_shift: term(&m2, LEVEL_TERM),
        n_obs: sample.len(),
        n_clusters: m1
            .as_ref()
            .or(m2.as_ref())
            .map_or(0, Fit::n_clusters),
        r_squared: m1.as_ref().ok().map(|f| f.r_squared),
    };

    if let Some(level) = &estimate.level {
        log::info!(
            "{state} {}: Model 1 DiD {:.2} (p={:.3})",
            outcome.label(),
            level.coef,
            level.p_value
        );
    }
    if let Some(slope) = &estimate.slope_change {
        log::info!(
            "{state} {}: Model 2 slope change {:.2} (p={:.3})",
            outcome.label(),
            slope.coef,
            slope.p_value
        );
    }
    estimate
}

/// Run both models over both outcomes for one case
#[must_use]
pub fn run_case(panel: &[CountyYear], case: &PolicyCase) -> Vec<DidEstimate> {
    log::info!(
        "Running DiD regressions for {} (policy year {})",
        case.policy_state,
        case.policy_year
    );
    Outcome::ALL
        .par_iter()
        .map(|&outcome| estimate_outcome(panel, case, outcome))
        .collect()
}
