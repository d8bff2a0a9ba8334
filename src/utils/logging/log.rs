//! Logging utilities
//!
//! Standardized log lines for pipeline stages.

use std::path::Path;

/// Log an operation start with consistent format
///
/// # Arguments
/// * `operation` - Description of the operation
/// * `path` - Path of the file or directory being operated on
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{} {}", operation, path.display());
}

/// Direction of a file operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Read,
    Write,
}

impl FileOp {
    fn verb(self) -> &'static str {
        match self {
            Self::Read => "Read",
            Self::Write => "Wrote",
        }
    }

    fn preposition(self) -> &'static str {
        match self {
            Self::Read => "from",
            Self::Write => "to",
        }
    }
}

fn completion_message(
    op: FileOp,
    path: &Path,
    rows: usize,
    elapsed: Option<std::time::Duration>,
) -> String {
    let base = format!("{} {rows} rows {} {}", op.verb(), op.preposition(), path.display());
    match elapsed {
        Some(duration) => format!("{base} in {duration:?}"),
        None => base,
    }
}

/// Log the row count of a finished read or write
pub fn log_operation_complete(
    op: FileOp,
    path: &Path,
    rows: usize,
    elapsed: Option<std::time::Duration>,
) {
    log::info!("{}", completion_message(op, path, rows, elapsed));
}

/// Log a warning, optionally tied to a path
pub fn log_warning(message: &str, path: Option<&Path>) {
    if let Some(path) = path {
        log::warn!("{}: {}", message, path.display());
    } else {
        log::warn!("{message}");
    }
}

/// Log a banner line separating pipeline stages
pub fn log_section(title: &str) {
    log::info!("{}", "=".repeat(60));
    log::info!("{title}");
    log::info!("{}", "=".repeat(60));
}
