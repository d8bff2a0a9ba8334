//! County-level evaluation of state opioid policies.
//!
//! Builds a county-year panel of opioid shipments (ARCOS), drug overdose
//! deaths (CDC WONDER) and population (Census), then estimates
//! difference-in-differences models for each policy case with clustered
//! standard errors and a set of robustness checks.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod report;
pub mod utils;

// Core types
pub use config::{PolicyCase, RobustnessConfig, StudyConfig, SuppressionPolicy};
pub use error::{Result, StudyError};
pub use models::{CountyYear, DidEstimate, Estimate, Outcome, RobustnessResult};

// Pipeline stages
pub use algorithm::did::{CaseAnalysis, run_case, run_checks};
pub use algorithm::panel::{PanelBuilder, analysis_panel, build_and_save};
pub use algorithm::regression::{Design, Factor, Fit, fit};
pub use ingest::ingest_raw_sources;

// Parquet IO
pub use utils::io::{read_records, read_records_async, write_records};
