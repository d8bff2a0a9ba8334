//! County-year panel construction

pub mod builder;
pub mod labels;

pub use builder::{PanelBuilder, PanelDiagnostics, analysis_panel, build_and_save, load_inputs};
pub use labels::{DidLabels, county_factor, label, year_factor};
