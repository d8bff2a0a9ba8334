//! Estimation samples and the shared two-way fixed effects design

use crate::algorithm::panel::{county_factor, label, year_factor};
use crate::algorithm::regression::{Design, Fit, fit};
use crate::error::Result;
use crate::models::{CountyYear, Outcome};

/// Rows on which an outcome is observed, with the outcome vector
#[derive(Debug, Clone)]
pub struct OutcomeSample<'a> {
    pub outcome: Outcome,
    pub rows: Vec<&'a CountyYear>,
    pub y: Vec<f64>,
}

impl<'a> OutcomeSample<'a> {
    /// Keep the rows where `outcome` is present and finite
    pub fn new(rows: impl IntoIterator<Item = &'a CountyYear>, outcome: Outcome) -> Self {
        let (rows, y): (Vec<_>, Vec<_>) = rows
            .into_iter()
            .filter_map(|r| outcome.value(r).map(|v| (r, v)))
            .unzip();
        Self { outcome, rows, y }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `y ~ treated_post + C(fips) + C(year)`, clustered by county
///
/// Optionally weighted by county population.
pub fn two_way_did(
    sample: &OutcomeSample<'_>,
    treated_state: &str,
    policy_year: i32,
    population_weighted: bool,
) -> Result<Fit> {
    let labels = label(&sample.rows, treated_state, policy_year);
    let counties = county_factor(&sample.rows);
    let mut design = Design::new(sample.outcome.column(), sample.y.clone())
        .regressor("treated_post", labels.post_treated())
        .absorb(counties.clone())
        .absorb(year_factor(&sample.rows))
        .cluster(counties);
    if population_weighted {
        design = design.weights(sample.rows.iter().map(|r| r.population).collect());
    }
    fit(&design)
}
