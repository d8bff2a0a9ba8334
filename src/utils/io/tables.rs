//! Delimited and JSON table IO

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, StudyError};
use crate::utils::logging::{FileOp, log_operation_complete};

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StudyError::io_at(parent, e))?;
    }
    Ok(())
}

/// Read a headed CSV file into typed rows
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    log_operation_complete(FileOp::Read, path, rows.len(), None);
    Ok(rows)
}

/// Write rows as a headed CSV file
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| StudyError::io_at(path, e))?;
    log_operation_complete(FileOp::Write, path, rows.len(), None);
    Ok(())
}

/// Write a value as pretty-printed JSON
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| StudyError::io_at(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    log::info!("Saved {}", path.display());
    Ok(())
}
