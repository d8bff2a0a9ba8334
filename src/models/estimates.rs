//! Result records produced by the estimation stages

use serde::{Deserialize, Serialize};

use crate::models::panel::Outcome;

/// One estimated coefficient with clustered inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub term: String,
    pub coef: f64,
    pub std_error: f64,
    pub z: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// DiD estimates for one case and one outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DidEstimate {
    pub state: String,
    pub outcome: Outcome,
    /// Model 1: `post:treated` under county and year effects
    pub level: Option<Estimate>,
    /// Model 2: change in slope, `post:year_c:treated`
    pub slope_change: Option<Estimate>,
    /// Model 2: level shift, `post:treated`
    pub level_shift: Option<Estimate>,
    pub n_obs: usize,
    pub n_clusters: usize,
    pub r_squared: Option<f64>,
}

/// Flat row of the main results table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DidTableRow {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Outcome")]
    pub outcome: String,
    #[serde(rename = "M1_DiD_Level")]
    pub m1_did_level: Option<f64>,
    #[serde(rename = "M1_SE")]
    pub m1_se: Option<f64>,
    #[serde(rename = "M1_Pval")]
    pub m1_pval: Option<f64>,
    #[serde(rename = "M2_DiD_Slope")]
    pub m2_did_slope: Option<f64>,
    #[serde(rename = "M2_SE")]
    pub m2_se: Option<f64>,
    #[serde(rename = "M2_Pval")]
    pub m2_pval: Option<f64>,
    #[serde(rename = "M2_Level_Shift")]
    pub m2_level_shift: Option<f64>,
    pub n_obs: usize,
    pub r_squared: Option<f64>,
}

impl From<&DidEstimate> for DidTableRow {
    fn from(e: &DidEstimate) -> Self {
        Self {
            state: e.state.clone(),
            outcome: e.outcome.label().to_string(),
            m1_did_level: e.level.as_ref().map(|x| x.coef),
            m1_se: e.level.as_ref().map(|x| x.std_error),
            m1_pval: e.level.as_ref().map(|x| x.p_value),
            m2_did_slope: e.slope_change.as_ref().map(|x| x.coef),
            m2_se: e.slope_change.as_ref().map(|x| x.std_error),
            m2_pval: e.slope_change.as_ref().map(|x| x.p_value),
            m2_level_shift: e.level_shift.as_ref().map(|x| x.coef),
            n_obs: e.n_obs,
            r_squared: e.r_squared,
        }
    }
}

/// The four sensitivity analyses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobustnessCheck {
    AlternativeControls,
    PopulationWeighting,
    Placebo,
    BorderExclusion,
}

impl RobustnessCheck {
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::AlternativeControls => "Alternative Control Groups",
            Self::PopulationWeighting => "Population Weighting",
            Self::Placebo => "Placebo Test",
            Self::BorderExclusion => "Border Exclusion",
        }
    }
}

/// Verdict of a robustness check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conclusion {
    Consistent,
    Sensitive,
    Robust,
    Weakened,
    Passes,
    Fails,
}

/// One regression inside a robustness check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantEstimate {
    /// Which variant, e.g. "all controls" or "population weighted"
    pub variant: String,
    pub outcome: Outcome,
    pub estimate: Estimate,
    pub n_obs: usize,
}

/// Outcome of one robustness check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessResult {
    pub check: RobustnessCheck,
    pub state: String,
    pub variants: Vec<VariantEstimate>,
    pub conclusion: Conclusion,
}

/// Flat row of the robustness table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessRow {
    pub check: String,
    pub state: String,
    pub variant: String,
    pub outcome: String,
    pub coef: f64,
    pub std_error: f64,
    pub p_value: f64,
    pub n_obs: usize,
    pub conclusion: Conclusion,
}

impl RobustnessResult {
    /// One table row per variant
    #[must_use]
    pub fn rows(&self) -> Vec<RobustnessRow> {
        self.variants
            .iter()
            .map(|v| RobustnessRow {
                check: self.check.title().to_string(),
                state: self.state.clone(),
                variant: v.variant.clone(),
                outcome: v.outcome.column().to_string(),
                coef: v.estimate.coef,
                std_error: v.estimate.std_error,
                p_value: v.estimate.p_value,
                n_obs: v.n_obs,
                conclusion: self.conclusion,
            })
            .collect()
    }
}

/// Whether a group is the treated state or the pooled controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    ControlStates,
    PolicyState,
}

/// Period relative to the policy year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Post,
    Pre,
}

/// Mean state-year mortality for a group in a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrePostRow {
    pub policy_state_abbrev: String,
    pub group: Group,
    pub period: Period,
    pub n_state_years: usize,
    pub mean_total_deaths: f64,
    pub mean_death_rate_per_100k: f64,
}

/// Mean of an outcome at one year, with its 95% interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub series: String,
    pub year: i32,
    pub mean: f64,
    pub se: f64,
    pub count: usize,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// A point on a fitted straight-line segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPoint {
    pub segment: String,
    pub year: i32,
    pub fitted: f64,
}
