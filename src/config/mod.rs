//! Configuration for the study pipeline.
//!
//! Defaults reproduce the Florida 2010 and Washington 2012 designs over
//! 2006–2015. A JSON file can override any field; missing fields fall back
//! to the defaults.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};
use crate::ingest::states::is_known_abbrev;

/// How suppressed CDC death counts enter the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionPolicy {
    /// Leave suppressed counts missing
    #[default]
    Missing,
    /// Predict suppressed counts from population, clamped to the suppression range
    Impute,
}

/// Settings for the robustness checks of one policy case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustnessConfig {
    /// Reduced control set for the alternative-controls check
    pub subset_controls: Vec<String>,
    /// Maximum absolute coefficient gap still called consistent
    pub consistency_threshold: f64,
    /// Fake policy year for the placebo test
    pub placebo_year: i32,
    /// Last year of data used by the placebo test
    pub placebo_last_year: i32,
    /// Treated-state counties excluded by the border check
    pub border_counties: Vec<String>,
    /// Significance level for "effect present" checks
    pub significance: f64,
    /// Significance level under which a placebo effect counts as spurious
    pub placebo_significance: f64,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self::florida()
    }
}

impl RobustnessConfig {
    /// Florida settings: southeastern controls, 2008 placebo, GA/AL border counties
    #[must_use]
    pub fn florida() -> Self {
        Self {
            subset_controls: strings(&["GA", "AL", "SC"]),
            consistency_threshold: 2e6,
            placebo_year: 2008,
            placebo_last_year: 2009,
            border_counties: strings(&[
                "12003", // Baker
                "12031", // Duval
                "12033", // Escambia
                "12037", // Franklin
                "12039", // Gadsden
                "12045", // Gulf
                "12059", // Holmes
                "12063", // Jackson
                "12065", // Jefferson
                "12073", // Leon
                "12077", // Liberty
                "12079", // Madison
                "12091", // Okaloosa
                "12113", // Santa Rosa
                "12121", // Suwannee
                "12131", // Walton
                "12133", // Washington
            ]),
            significance: 0.05,
            placebo_significance: 0.10,
        }
    }
}

/// One treated state with its control states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCase {
    /// Human-readable name, e.g. "Florida case"
    pub name: String,
    /// Postal abbreviation of the treated state
    pub policy_state: String,
    /// First year the policy is in effect
    pub policy_year: i32,
    /// Postal abbreviations of the control states
    pub control_states: Vec<String>,
    /// Stem used for the clean panel file, e.g. "fl" -> `fl_panel_clean.parquet`
    pub file_stem: String,
    /// Robustness settings; cases without them skip the checks
    #[serde(default)]
    pub robustness: Option<RobustnessConfig>,
}

impl PolicyCase {
    /// Florida, 2010, southeastern controls
    #[must_use]
    pub fn florida() -> Self {
        Self {
            name: "Florida case".to_string(),
            policy_state: "FL".to_string(),
            policy_year: 2010,
            control_states: strings(&["GA", "AL", "SC", "NC", "TN", "MS"]),
            file_stem: "fl".to_string(),
            robustness: Some(RobustnessConfig::florida()),
        }
    }

    /// Washington, 2012, western and comparison controls
    #[must_use]
    pub fn washington() -> Self {
        Self {
            name: "Washington case".to_string(),
            policy_state: "WA".to_string(),
            policy_year: 2012,
            control_states: strings(&["OR", "CO", "MN", "NV", "CA", "VA"]),
            file_stem: "wa".to_string(),
            robustness: None,
        }
    }

    /// Treated state followed by the controls
    #[must_use]
    pub fn states(&self) -> Vec<String> {
        std::iter::once(self.policy_state.clone())
            .chain(self.control_states.iter().cloned())
            .collect()
    }
}

/// File names of the raw sources, relative to `raw_dir`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSources {
    pub arcos_transactions: String,
    pub county_crosswalk: String,
    pub mortality: String,
    /// Census estimate files; later files win for overlapping county-years
    pub census_population: Vec<String>,
}

impl Default for RawSources {
    fn default() -> Self {
        Self {
            arcos_transactions: "arcos_transactions.csv".to_string(),
            county_crosswalk: "county_crosswalk.csv".to_string(),
            mortality: "cdc_wonder_drug_deaths.csv".to_string(),
            census_population: strings(&["co-est00int-tot.csv", "co-est2019-alldata.csv"]),
        }
    }
}

/// Configuration for the whole study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// First year of the panel
    pub start_year: i32,
    /// Last year of the panel (inclusive)
    pub end_year: i32,
    /// Directory with raw downloads
    pub raw_dir: PathBuf,
    /// Directory with processed Parquet files
    pub processed_dir: PathBuf,
    /// Directory for output tables
    pub tables_dir: PathBuf,
    /// Raw file names
    pub raw: RawSources,
    /// Treatment of suppressed death counts
    pub suppression: SuppressionPolicy,
    /// Policy cases to analyse
    pub cases: Vec<PolicyCase>,
    /// Worker threads for parallel estimation
    pub threads: usize,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            start_year: 2006,
            end_year: 2015,
            raw_dir: PathBuf::from("data").join("raw"),
            processed_dir: PathBuf::from("data").join("processed"),
            tables_dir: PathBuf::from("outputs").join("tables"),
            raw: RawSources::default(),
            suppression: SuppressionPolicy::Missing,
            cases: vec![PolicyCase::florida(), PolicyCase::washington()],
            threads: num_cpus::get(),
        }
    }
}

impl StudyConfig {
    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| StudyError::io_at(path, e))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(StudyError::Config(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }
        if self.cases.is_empty() {
            return Err(StudyError::Config("no policy cases configured".to_string()));
        }
        for case in &self.cases {
            if !self.years().contains(&case.policy_year) {
                return Err(StudyError::Config(format!(
                    "{}: policy year {} outside {}-{}",
                    case.name, case.policy_year, self.start_year, self.end_year
                )));
            }
            if case.control_states.contains(&case.policy_state) {
                return Err(StudyError::Config(format!(
                    "{}: policy state {} also listed as control",
                    case.name, case.policy_state
                )));
            }
            if let Some(unknown) = case.states().into_iter().find(|s| !is_known_abbrev(s)) {
                return Err(StudyError::Config(format!(
                    "{}: unknown state abbreviation '{unknown}'",
                    case.name
                )));
            }
            if case.control_states.is_empty() {
                return Err(StudyError::Config(format!(
                    "{}: no control states",
                    case.name
                )));
            }
        }
        Ok(())
    }

    /// Inclusive year range of the panel
    #[must_use]
    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    fn span(&self) -> String {
        format!("{}_{}", self.start_year, self.end_year)
    }

    #[must_use]
    pub fn deaths_path(&self) -> PathBuf {
        self.processed_dir
            .join(format!("vital_stats_deaths_{}.parquet", self.span()))
    }

    #[must_use]
    pub fn population_path(&self) -> PathBuf {
        self.processed_dir
            .join(format!("us_population_condensed_{}.parquet", self.span()))
    }

    #[must_use]
    pub fn shipments_path(&self) -> PathBuf {
        self.processed_dir.join("arcos_county_year_with_fips.parquet")
    }

    #[must_use]
    pub fn panel_path(&self) -> PathBuf {
        self.processed_dir
            .join(format!("opioid_panel_{}.parquet", self.span()))
    }

    /// Clean analysis panel of one case
    #[must_use]
    pub fn case_panel_path(&self, case: &PolicyCase) -> PathBuf {
        self.processed_dir
            .join(format!("{}_panel_clean.parquet", case.file_stem))
    }

    /// Look up a case by treated state abbreviation or file stem
    #[must_use]
    pub fn case(&self, key: &str) -> Option<&PolicyCase> {
        self.cases.iter().find(|c| {
            c.policy_state.eq_ignore_ascii_case(key) || c.file_stem.eq_ignore_ascii_case(key)
        })
    }
}

impl fmt::Display for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Study Configuration:")?;
        writeln!(f, "  Years: {}-{}", self.start_year, self.end_year)?;
        writeln!(f, "  Raw Directory: {}", self.raw_dir.display())?;
        writeln!(f, "  Processed Directory: {}", self.processed_dir.display())?;
        writeln!(f, "  Tables Directory: {}", self.tables_dir.display())?;
        writeln!(f, "  Suppressed Deaths: {:?}", self.suppression)?;
        writeln!(f, "  Threads: {}", self.threads)?;
        for case in &self.cases {
            writeln!(
                f,
                "  {}: {} from {} vs {}{}",
                case.name,
                case.policy_state,
                case.policy_year,
                case.control_states.join(", "),
                if case.robustness.is_some() {
                    " (robustness checks)"
                } else {
                    ""
                }
            )?;
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
