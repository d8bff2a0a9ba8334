//! Yearly outcome means with confidence bands, and pre/post trend lines

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::algorithm::regression::line_fit;
use crate::config::PolicyCase;
use crate::models::{CountyYear, Outcome, SegmentPoint, TrendPoint};

pub const CONTROLS_SERIES: &str = "Controls";

/// Half-width of the figure bands in standard errors
pub const BAND_Z: f64 = 1.96;

/// Mean, standard deviation and count of an outcome in one state-year
#[derive(Debug, Clone, PartialEq)]
pub struct StateYearStats {
    pub state_abbrev: String,
    pub year: i32,
    pub mean: f64,
    /// Sample standard deviation; NaN for a single county
    pub std: f64,
    pub count: usize,
}

impl StateYearStats {
    #[must_use]
    pub fn se(&self) -> f64 {
        self.std / (self.count as f64).sqrt()
    }
}

/// Figure data for one case and outcome
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSeries {
    pub outcome: Outcome,
    /// Policy state and pooled controls, by year
    pub points: Vec<TrendPoint>,
    /// Straight-line fits over the pre and post segments
    pub segments: Vec<SegmentPoint>,
}

fn point(series: &str, year: i32, mean: f64, se: f64, count: usize) -> TrendPoint {
    TrendPoint {
        series: series.to_string(),
        year,
        mean,
        se,
        count,
        ci_lower: mean - BAND_Z * se,
        ci_upper: mean + BAND_Z * se,
    }
}

/// Per state-year statistics of an outcome, skipping missing values
#[must_use]
pub fn state_year_stats(panel: &[CountyYear], outcome: Outcome) -> Vec<StateYearStats> {
    let mut cells: BTreeMap<(&str, i32), Vec<f64>> = BTreeMap::new();
    for row in panel {
        if let Some(v) = outcome.value(row) {
            cells.entry((row.state_abbrev.as_str(), row.year)).or_default().push(v);
        }
    }
    cells
        .into_iter()
        .map(|((state, year), values)| {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let std = if values.len() > 1 {
                (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
            } else {
                f64::NAN
            };
            StateYearStats {
                state_abbrev: state.to_string(),
                year,
                mean,
                std,
                count: values.len(),
            }
        })
        .collect()
}

/// Pool control states per year, weighting each state by its county count
#[must_use]
pub fn pool_controls<'a>(stats: impl IntoIterator<Item = &'a StateYearStats>) -> Vec<TrendPoint> {
    let by_year = stats.into_iter().sorted_by_key(|s| s.year).chunk_by(|s| s.year);
    by_year
        .into_iter()
        .map(|(year, group)| {
            let group: Vec<_> = group.collect();
            let total: usize = group.iter().map(|s| s.count).sum();
            let n = total as f64;
            let mean = group.iter().map(|s| s.mean * s.count as f64).sum::<f64>() / n;
            let se = group
                .iter()
                .map(|s| (s.se() * s.count as f64).powi(2))
                .sum::<f64>()
                .sqrt()
                / n;
            point(CONTROLS_SERIES, year, mean, se, total)
        })
        .collect()
}

/// Fitted straight line over `(year, value)` points at each distinct year
///
/// Fewer than two distinct years returns the raw points.
#[must_use]
pub fn fit_segment(name: &str, points: &[(i32, f64)]) -> Vec<SegmentPoint> {
    let xs: Vec<f64> = points.iter().map(|(y, _)| f64::from(*y)).collect();
    let ys: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    match line_fit(&xs, &ys) {
        Some(line) => points
            .iter()
            .map(|(year, _)| *year)
            .sorted()
            .dedup()
            .map(|year| SegmentPoint {
                segment: name.to_string(),
                year,
                fitted: line.predict(f64::from(year)),
            })
            .collect(),
        None => points
            .iter()
            .sorted_by_key(|(year, _)| *year)
            .map(|&(year, fitted)| SegmentPoint {
                segment: name.to_string(),
                year,
                fitted,
            })
            .collect(),
    }
}

/// State-year means with 95% bands, and pre/post trend lines
#[must_use]
pub fn trend_series(panel: &[CountyYear], case: &PolicyCase, outcome: Outcome) -> TrendSeries {
    let stats = state_year_stats(panel, outcome);
    let (policy, controls): (Vec<_>, Vec<_>) = stats
        .iter()
        .partition(|s| s.state_abbrev == case.policy_state);

    let mut points: Vec<TrendPoint> = policy
        .iter()
        .map(|s| point(&case.policy_state, s.year, s.mean, s.se(), s.count))
        .collect();
    points.extend(pool_controls(controls.iter().copied()));

    let mut segments = Vec::new();
    for (label, group) in [(case.policy_state.as_str(), &policy), (CONTROLS_SERIES, &controls)] {
        let (pre, post): (Vec<(i32, f64)>, Vec<(i32, f64)>) = group
            .iter()
            .map(|s| (s.year, s.mean))
            .partition(|(year, _)| *year < case.policy_year);
        segments.extend(fit_segment(&format!("{label} pre"), &pre));
        segments.extend(fit_segment(&format!("{label} post"), &post));
    }

    TrendSeries {
        outcome,
        points,
        segments,
    }
}
