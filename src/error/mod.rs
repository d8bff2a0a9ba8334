//! Error handling for the study pipeline.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Specialized error type for panel construction and estimation
#[derive(Debug, Error)]
pub enum StudyError {
    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// IO error tied to a specific path
    #[error("IO error on {}: {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Error building or slicing Arrow arrays
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error converting between typed records and record batches
    #[error("Record conversion error: {0}")]
    Conversion(#[from] serde_arrow::Error),

    /// Error reading or writing delimited text
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error reading or writing JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A source does not have the columns or types we expect
    #[error("Schema error: {0}")]
    Schema(String),

    /// Data failed a consistency check
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration is inconsistent or unreadable
    #[error("Configuration error: {0}")]
    Config(String),

    /// The regression could not be estimated
    #[error("Regression error: {0}")]
    Regression(String),

    /// A coefficient was requested that the fit does not carry
    #[error("Coefficient '{name}' not estimated (available: {available})")]
    MissingCoefficient { name: String, available: String },
}

impl StudyError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a regression error
    pub fn regression(message: impl Into<String>) -> Self {
        Self::Regression(message.into())
    }

    /// Attach a path to an IO error
    pub fn io_at(path: &Path, source: io::Error) -> Self {
        Self::IoAt {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for study operations
pub type Result<T> = std::result::Result<T, StudyError>;
