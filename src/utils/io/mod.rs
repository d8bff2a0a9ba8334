//! IO utilities for Parquet panels and output tables

pub mod parquet;
pub mod tables;

pub use parquet::{
    DEFAULT_BATCH_SIZE, ParquetRecord, get_batch_size, read_records, read_records_async,
    write_records,
};
pub use tables::{read_csv, write_csv, write_json};
