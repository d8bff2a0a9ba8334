//! Parquet file operations
//!
//! Typed records are converted to and from Arrow record batches with
//! `serde_arrow`. Each record type declares its Arrow fields once, so the
//! written schema does not depend on which values happen to be present.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow_schema::FieldRef;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, StudyError};
use crate::utils::logging::{FileOp, log_operation_complete, log_operation_start};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Helper function to get batch size from environment
#[must_use]
pub fn get_batch_size() -> usize {
    std::env::var("PARQUET_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_BATCH_SIZE)
}

/// A record type that can be stored as a Parquet row
pub trait ParquetRecord: Serialize + DeserializeOwned {
    /// Arrow fields written for this record, in column order
    fn arrow_fields() -> Vec<FieldRef>;
}

/// Read every row of a Parquet file into typed records
///
/// Columns not present on the record type are ignored, which lets us read
/// files that carry extra diagnostics columns.
pub fn read_records<T: ParquetRecord>(path: &Path) -> Result<Vec<T>> {
    let start = Instant::now();
    log_operation_start("Reading parquet file", path);

    let file = File::open(path).map_err(|e| StudyError::io_at(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(get_batch_size())
        .build()?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch?;
        let rows: Vec<T> = serde_arrow::from_record_batch(&batch)?;
        records.extend(rows);
    }

    log_operation_complete(FileOp::Read, path, records.len(), Some(start.elapsed()));
    Ok(records)
}

/// Write typed records to a Parquet file, creating parent directories
pub fn write_records<T: ParquetRecord>(path: &Path, records: &[T]) -> Result<()> {
    let start = Instant::now();
    log_operation_start("Writing parquet file", path);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StudyError::io_at(parent, e))?;
    }

    let fields = T::arrow_fields();
    let batch = serde_arrow::to_record_batch(&fields, &records)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path).map_err(|e| StudyError::io_at(path, e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    log_operation_complete(FileOp::Write, path, records.len(), Some(start.elapsed()));
    Ok(())
}

/// Read a Parquet file on the blocking pool of the tokio runtime
pub async fn read_records_async<T>(path: PathBuf) -> Result<Vec<T>>
where
    T: ParquetRecord + Send + 'static,
{
    tokio::task::spawn_blocking(move || read_records::<T>(&path))
        .await
        .map_err(|e| StudyError::Io(std::io::Error::other(e)))?
}
