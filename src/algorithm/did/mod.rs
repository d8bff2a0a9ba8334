//! Difference-in-differences analyses of a policy case
//!
//! Everything here works on the clean analysis panel of one case: the main
//! level and trend models, the robustness checks, the pre/post mortality
//! summary and the yearly trend series used for figures.

pub mod models;
pub mod robustness;
pub mod sample;
pub mod summary;
pub mod trends;

use std::time::Instant;

use crate::config::PolicyCase;
use crate::models::{CountyYear, DidEstimate, Outcome, PrePostRow, RobustnessResult};

pub use models::{estimate_outcome, levels_model, run_case, trends_model};
pub use robustness::{
    alternative_controls, border_exclusion, placebo, population_weighting, run_checks,
};
pub use sample::{OutcomeSample, two_way_did};
pub use summary::{StateYear, pre_post_summary, state_year_totals};
pub use trends::{StateYearStats, TrendSeries, fit_segment, pool_controls, trend_series};

/// Every analysis of one case
#[derive(Debug, Clone)]
pub struct CaseAnalysis {
    pub case: PolicyCase,
    pub estimates: Vec<DidEstimate>,
    pub robustness: Vec<RobustnessResult>,
    pub pre_post: Vec<PrePostRow>,
    pub trends: Vec<TrendSeries>,
}

impl CaseAnalysis {
    /// Run all analyses of `case` on its analysis panel
    #[must_use]
    pub fn run(panel: &[CountyYear], case: &PolicyCase) -> Self {
        let start = Instant::now();
        let (estimates, robustness) =
            rayon::join(|| run_case(panel, case), || run_checks(panel, case));
        let analysis = Self {
            case: case.clone(),
            estimates,
            robustness,
            pre_post: pre_post_summary(panel, case),
            trends: Outcome::ALL
                .iter()
                .map(|&outcome| trend_series(panel, case, outcome))
                .collect(),
        };
        log::info!("{} analysed in {:?}", case.name, start.elapsed());
        analysis
    }
}
