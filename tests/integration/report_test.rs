use opioid_did::PolicyCase;
use opioid_did::algorithm::did::CaseAnalysis;
use opioid_did::models::{Group, Period, PrePostRow};
use opioid_did::report::{inspect_parquet, write_all};
use opioid_did::utils::io::{read_csv, write_records};

use crate::utils::{level_shift_panel, temp_dir};

#[test]
fn full_case_analysis_writes_all_tables() {
    let case = PolicyCase::florida();
    let panel = level_shift_panel(&case, 5.0, -3e6);
    let analysis = CaseAnalysis::run(&panel, &case);

    assert_eq!(analysis.estimates.len(), 2);
    assert_eq!(analysis.robustness.len(), 4);
    assert_eq!(analysis.pre_post.len(), 4);
    assert_eq!(analysis.trends.len(), 2);

    let dir = temp_dir("report");
    let written = write_all(&dir, std::slice::from_ref(&analysis)).unwrap();
    // results, pre/post, robustness, 2 x (series + segments), summary
    assert_eq!(written.len(), 8);
    assert!(written.iter().all(|p| p.exists()));

    let results = std::fs::read_to_string(dir.join("did_regression_results.csv")).unwrap();
    let header = results.lines().next().unwrap();
    assert!(header.starts_with("State,Outcome,M1_DiD_Level,M1_SE,M1_Pval,M2_DiD_Slope"));
    assert_eq!(results.lines().count(), 3);

    let pre_post: Vec<PrePostRow> = read_csv(&dir.join("pre_post_mean_deaths.csv")).unwrap();
    let fl_pre = pre_post
        .iter()
        .find(|r| r.group == Group::PolicyState && r.period == Period::Pre)
        .unwrap();
    assert_eq!(fl_pre.n_state_years, 4);

    assert!(dir.join("trend_series_fl_drug_death_rate_per_100k.csv").exists());
    assert!(dir.join("trend_segments_fl_mme_per_100k.csv").exists());

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("study_summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary[0]["policy_state"], "FL");
    assert_eq!(summary[0]["robustness"].as_array().unwrap().len(), 4);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn trend_series_pools_controls_and_fits_segments() {
    let case = PolicyCase::florida();
    let panel = level_shift_panel(&case, 5.0, -3e6);
    let analysis = CaseAnalysis::run(&panel, &case);
    let deaths = &analysis.trends[1];

    let fl_points = deaths.points.iter().filter(|p| p.series == "FL").count();
    let control_points: Vec<_> = deaths.points.iter().filter(|p| p.series == "Controls").collect();
    assert_eq!(fl_points, 10);
    assert_eq!(control_points.len(), 10);
    assert!(control_points.iter().all(|p| p.count == 24));
    assert!(control_points.iter().all(|p| p.ci_lower < p.mean && p.mean < p.ci_upper));

    let segments: Vec<_> = deaths.segments.iter().map(|s| s.segment.as_str()).collect();
    for name in ["FL pre", "FL post", "Controls pre", "Controls post"] {
        assert!(segments.contains(&name), "missing segment {name}");
    }
    assert_eq!(deaths.segments.iter().filter(|s| s.segment == "FL pre").count(), 4);
}

#[test]
fn inspect_reports_shape_and_death_statistics() {
    let case = PolicyCase::washington();
    let panel = level_shift_panel(&case, 1.0, 1e6);
    let path = temp_dir("inspect").join("wa_panel_clean.parquet");
    write_records(&path, &panel).unwrap();

    let profile = inspect_parquet(&path).unwrap();
    assert_eq!(profile.rows, panel.len());
    assert_eq!(profile.columns.len(), 12);
    assert_eq!(profile.year_ranges, vec![("year".to_string(), 2006.0, 2015.0)]);

    let fips = profile.unique_counts.iter().find(|(c, _)| c == "fips").unwrap();
    assert_eq!(fips.1, 32);
    let states = profile.unique_counts.iter().find(|(c, _)| c == "state_abbrev").unwrap();
    assert_eq!(states.1, 7);

    let deaths = profile
        .death_stats
        .iter()
        .find(|s| s.column == "drug_deaths")
        .unwrap();
    assert_eq!(deaths.count, panel.len());
    let described: Vec<_> = profile.death_stats.iter().map(|s| s.column.as_str()).collect();
    assert_eq!(described, vec!["drug_deaths", "drug_death_rate_per_100k"]);
    assert!(profile.to_string().contains("drug_death_rate_per_100k"));
    std::fs::remove_file(&path).ok();
}
