//! Quick profile of a Parquet panel
//!
//! Works on any Parquet file, not only our own panels: columns are picked
//! by name the way an analyst would eyeball them (year-like, geographic,
//! death-related).

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rustc_hash::FxHashSet;

use crate::error::{Result, StudyError};
use crate::utils::io::get_batch_size;

const YEAR_KEYS: &[&str] = &["year", "date"];
const GEO_KEYS: &[&str] = &["state", "county", "fips"];
const DEATH_KEYS: &[&str] = &["death", "overdose", "mortality"];
const POPULATION_KEYS: &[&str] = &["pop"];

/// `describe()`-style statistics of a numeric column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    fn of(column: &str, values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            f64::NAN
        };
        Self {
            column: column.to_string(),
            count: values.len(),
            mean,
            std,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Shape and headline statistics of a Parquet file
#[derive(Debug, Clone)]
pub struct PanelProfile {
    pub path: PathBuf,
    pub rows: usize,
    /// Column names with their Arrow types
    pub columns: Vec<(String, DataType)>,
    pub year_ranges: Vec<(String, f64, f64)>,
    pub unique_counts: Vec<(String, usize)>,
    pub population_columns: Vec<String>,
    pub death_stats: Vec<ColumnStats>,
}

fn matches_any(name: &str, keys: &[&str]) -> bool {
    let lower = name.to_lowercase();
    keys.iter().any(|k| lower.contains(k))
}

// Flags and text are left out of the describe table
fn describable(dtype: &DataType) -> bool {
    dtype.is_numeric()
}

// Columns that cannot be cast (e.g. dates to floats) yield no arrays
fn concat_column(batches: &[RecordBatch], index: usize, to: &DataType) -> Result<Vec<ArrayRef>> {
    batches
        .iter()
        .filter(|b| can_cast_types(b.column(index).data_type(), to))
        .map(|b| cast(b.column(index), to).map_err(StudyError::from))
        .collect()
}

fn numeric_values(batches: &[RecordBatch], index: usize) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for array in concat_column(batches, index, &DataType::Float64)? {
        let floats = array.as_primitive::<Float64Type>();
        values.extend(floats.iter().flatten().filter(|v| v.is_finite()));
    }
    Ok(values)
}

fn unique_count(batches: &[RecordBatch], index: usize) -> Result<usize> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    for array in concat_column(batches, index, &DataType::Utf8)? {
        let strings = array.as_string::<i32>();
        seen.extend(strings.iter().flatten().map(str::to_string));
    }
    Ok(seen.len())
}

/// Profile a Parquet file
pub fn inspect_parquet(path: &Path) -> Result<PanelProfile> {
    let file = File::open(path).map_err(|e| StudyError::io_at(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let batches = builder
        .with_batch_size(get_batch_size())
        .build()?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut profile = PanelProfile {
        path: path.to_path_buf(),
        rows: batches.iter().map(RecordBatch::num_rows).sum(),
        columns: schema
            .fields()
            .iter()
            .map(|f| (f.name().clone(), f.data_type().clone()))
            .collect(),
        year_ranges: Vec::new(),
        unique_counts: Vec::new(),
        population_columns: Vec::new(),
        death_stats: Vec::new(),
    };

    for (index, field) in schema.fields().iter().enumerate() {
        let name = field.name();
        if matches_any(name, YEAR_KEYS) {
            let values = numeric_values(&batches, index)?;
            if !values.is_empty() {
                let stats = ColumnStats::of(name, &values);
                profile.year_ranges.push((name.clone(), stats.min, stats.max));
            }
        }
        if matches_any(name, GEO_KEYS) {
            profile.unique_counts.push((name.clone(), unique_count(&batches, index)?));
        }
        if matches_any(name, POPULATION_KEYS) {
            profile.population_columns.push(name.clone());
        }
        if matches_any(name, DEATH_KEYS) && describable(field.data_type()) {
            let values = numeric_values(&batches, index)?;
            if !values.is_empty() {
                profile.death_stats.push(ColumnStats::of(name, &values));
            }
        }
    }

    Ok(profile)
}

impl fmt::Display for PanelProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Summary for {} ===", self.path.display())?;
        writeln!(f, "Rows: {}, Columns: {}", self.rows, self.columns.len())?;

        writeln!(f, "\n[1] Columns & types:")?;
        for (name, dtype) in &self.columns {
            writeln!(f, "  {name:<28} {dtype}")?;
        }

        writeln!(f, "\n[2] Year-like columns and ranges:")?;
        if self.year_ranges.is_empty() {
            writeln!(f, "  (none found)")?;
        }
        for (name, min, max) in &self.year_ranges {
            writeln!(f, "  - {name}: {min} to {max}")?;
        }

        writeln!(f, "\n[3] Geographic columns (unique counts):")?;
        if self.unique_counts.is_empty() {
            writeln!(f, "  (none found)")?;
        }
        for (name, count) in &self.unique_counts {
            writeln!(f, "  - {name}: {count} unique values")?;
        }

        writeln!(f, "\n[4] Population-related columns:")?;
        if self.population_columns.is_empty() {
            writeln!(f, "  (none detected)")?;
        } else {
            writeln!(f, "  {}", self.population_columns.join(", "))?;
        }

        writeln!(f, "\n[5] Describe death-related columns:")?;
        if self.death_stats.is_empty() {
            writeln!(f, "  (none detected)")?;
            return Ok(());
        }
        writeln!(
            f,
            "  {:<28} {:>8} {:>12} {:>12} {:>12} {:>12}",
            "column", "count", "mean", "std", "min", "max"
        )?;
        for s in &self.death_stats {
            writeln!(
                f,
                "  {:<28} {:>8} {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
                s.column, s.count, s.mean, s.std, s.min, s.max
            )?;
        }
        Ok(())
    }
}
