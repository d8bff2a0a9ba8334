//! Shared helpers: FIPS codes, file IO, logging

pub mod fips;
pub mod io;
pub mod logging;

pub use fips::{compose_fips, normalize_fips};
pub use io::{read_csv, read_records, write_csv, write_json, write_records};
pub use logging::{log_operation_complete, log_operation_start, log_section, log_warning};
