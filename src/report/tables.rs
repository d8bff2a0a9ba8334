//! Output tables of the study

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::algorithm::did::{CaseAnalysis, TrendSeries};
use crate::error::Result;
use crate::models::{DidEstimate, DidTableRow, PrePostRow, RobustnessResult, RobustnessRow};
use crate::utils::io::{write_csv, write_json};

pub const DID_RESULTS_FILE: &str = "did_regression_results.csv";
pub const ROBUSTNESS_FILE: &str = "robustness_checks.csv";
pub const PRE_POST_FILE: &str = "pre_post_mean_deaths.csv";
pub const SUMMARY_FILE: &str = "study_summary.json";

/// Write the main DiD table
pub fn write_did_results(dir: &Path, estimates: &[DidEstimate]) -> Result<PathBuf> {
    let path = dir.join(DID_RESULTS_FILE);
    let rows: Vec<DidTableRow> = estimates.iter().map(DidTableRow::from).collect();
    write_csv(&path, &rows)?;
    Ok(path)
}

/// Write one row per robustness variant
pub fn write_robustness(dir: &Path, results: &[RobustnessResult]) -> Result<PathBuf> {
    let path = dir.join(ROBUSTNESS_FILE);
    let rows: Vec<RobustnessRow> = results.iter().flat_map(RobustnessResult::rows).collect();
    write_csv(&path, &rows)?;
    Ok(path)
}

pub fn write_pre_post(dir: &Path, rows: &[PrePostRow]) -> Result<PathBuf> {
    let path = dir.join(PRE_POST_FILE);
    write_csv(&path, rows)?;
    Ok(path)
}

/// Write the band and segment tables of one trend series
pub fn write_trends(dir: &Path, file_stem: &str, series: &TrendSeries) -> Result<(PathBuf, PathBuf)> {
    let points = dir.join(format!("trend_series_{file_stem}_{}.csv", series.outcome.column()));
    let segments = dir.join(format!("trend_segments_{file_stem}_{}.csv", series.outcome.column()));
    write_csv(&points, &series.points)?;
    write_csv(&segments, &series.segments)?;
    Ok((points, segments))
}

#[derive(Debug, Serialize)]
struct CaseSummary<'a> {
    name: &'a str,
    policy_state: &'a str,
    policy_year: i32,
    control_states: &'a [String],
    estimates: &'a [DidEstimate],
    robustness: &'a [RobustnessResult],
    pre_post: &'a [PrePostRow],
}

/// Bundle every estimate into one JSON document
pub fn write_summary_json(dir: &Path, analyses: &[CaseAnalysis]) -> Result<PathBuf> {
    let path = dir.join(SUMMARY_FILE);
    let cases: Vec<CaseSummary<'_>> = analyses
        .iter()
        .map(|a| CaseSummary {
            name: &a.case.name,
            policy_state: &a.case.policy_state,
            policy_year: a.case.policy_year,
            control_states: &a.case.control_states,
            estimates: &a.estimates,
            robustness: &a.robustness,
            pre_post: &a.pre_post,
        })
        .collect();
    write_json(&path, &cases)?;
    Ok(path)
}

/// Write every table of the given analyses
pub fn write_all(dir: &Path, analyses: &[CaseAnalysis]) -> Result<Vec<PathBuf>> {
    let estimates: Vec<DidEstimate> = analyses.iter().flat_map(|a| a.estimates.clone()).collect();
    let robustness: Vec<RobustnessResult> =
        analyses.iter().flat_map(|a| a.robustness.clone()).collect();
    let pre_post: Vec<PrePostRow> = analyses.iter().flat_map(|a| a.pre_post.clone()).collect();

    let mut written = vec![
        write_did_results(dir, &estimates)?,
        write_pre_post(dir, &pre_post)?,
    ];
    if !robustness.is_empty() {
        written.push(write_robustness(dir, &robustness)?);
    }
    for analysis in analyses {
        for series in &analysis.trends {
            let (points, segments) = write_trends(dir, &analysis.case.file_stem, series)?;
            written.extend([points, segments]);
        }
    }
    written.push(write_summary_json(dir, analyses)?);
    Ok(written)
}
