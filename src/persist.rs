//! Writing the feature table to disk, and reading it back.
//!
//! The table is written to a sibling `.tmp` file, synced to disk, and
//! renamed into place once complete, so a file at the final path is always
//! a whole table.
//! Floats are written in Rust's shortest round-trip form, so reading a file
//! back reproduces the in-memory values exactly.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ExtractorConfig;
use crate::error::{FeatureError, Result};
use crate::table::{Column, FeatureTable};
use crate::types::{FeatureRow, Level, LevelSet};

/// Writes feature tables to a deterministic path.
#[derive(Debug, Clone)]
pub struct Persister {
    output_dir: PathBuf,
    file_name: String,
}

impl Persister {
    /// Create a persister writing `file_name` inside `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_name: file_name.into(),
        }
    }

    /// Persister for the path a configuration dictates.
    pub fn for_config(config: &ExtractorConfig) -> Self {
        Self::new(&config.output_dir, config.output_file_name())
    }

    /// Final path of the written table.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.file_name)
    }

    /// Temporary path the table is staged at. Unique per process.
    fn temp_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}.tmp", self.file_name, std::process::id()))
    }

    /// Write `table`, creating the output directory if needed.
    ///
    /// # Returns
    /// The path the table was written to.
    ///
    /// # Errors
    /// `FeatureError::Persistence` if the directory cannot be created or the
    /// file cannot be written. No file is left at the final path on failure.
    pub fn write(&self, table: &FeatureTable) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            FeatureError::persistence(
                &self.output_dir,
                format!("failed to create output directory: {e}"),
            )
        })?;

        let final_path = self.output_path();
        let temp_path = self.temp_path();

        log::info!(
            "Saving {} rows x {} columns to {}",
            table.len(),
            table.columns().len(),
            final_path.display()
        );

        if let Err(e) = write_csv(table, &temp_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            FeatureError::persistence(&final_path, format!("failed to rename temp file: {e}"))
        })?;

        log::info!("Saved feature table to {}", final_path.display());
        Ok(final_path)
    }
}

fn write_csv(table: &FeatureTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| FeatureError::persistence(path, format!("failed to create file: {e}")))?;

    let columns = table.columns();
    writer
        .write_record(columns.iter().map(|c| c.to_string()))
        .map_err(|e| FeatureError::persistence(path, e))?;

    let mut record: Vec<String> = Vec::with_capacity(columns.len());
    for row in table.rows() {
        record.clear();
        for column in &columns {
            record.push(format_cell(column, row)?);
        }
        writer
            .write_record(&record)
            .map_err(|e| FeatureError::persistence(path, e))?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| FeatureError::persistence(path, format!("failed to flush output: {e}")))?;
    file.sync_all()
        .map_err(|e| FeatureError::persistence(path, format!("failed to sync output: {e}")))?;
    Ok(())
}

fn format_cell(column: &Column, row: &FeatureRow) -> Result<String> {
    match column {
        Column::Time => Ok(row.timestamp().to_string()),
        Column::Label => Ok(row.label().to_string()),
        _ => column.value(row).map(|v| v.to_string()).ok_or_else(|| {
            FeatureError::structural(format!("row {} has no value for {column}", row.label()))
        }),
    }
}

/// Read a persisted feature table back into memory.
///
/// The depth is inferred from the header, which must match the fixed
/// column layout exactly.
pub fn read_table(path: impl AsRef<Path>) -> Result<FeatureTable> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| FeatureError::persistence(path, format!("failed to open file: {e}")))?;

    let headers = reader
        .headers()
        .map_err(|e| FeatureError::structural(format!("unreadable header: {e}")))?
        .clone();

    let depth = depth_from_header(&headers)?;
    let mut table = FeatureTable::new(depth);

    for (line, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| FeatureError::structural(format!("row {line}: {e}")))?;
        table.push(parse_row(&record, depth, line)?)?;
    }

    Ok(table)
}

fn depth_from_header(headers: &csv::StringRecord) -> Result<usize> {
    let n = headers.len();
    if n < 3 || (n - 3) % 4 != 0 {
        return Err(FeatureError::structural(format!(
            "header has {n} columns, expected 4 * depth + 3"
        )));
    }
    let depth = (n - 3) / 4;

    for (expected, actual) in Column::layout(depth).iter().zip(headers.iter()) {
        if Column::parse(actual) != Some(*expected) {
            return Err(FeatureError::structural(format!(
                "unexpected column '{actual}', expected '{expected}'"
            )));
        }
    }
    Ok(depth)
}

fn cell(record: &csv::StringRecord, i: usize, line: usize) -> Result<&str> {
    record
        .get(i)
        .ok_or_else(|| FeatureError::structural(format!("row {line}: missing column {i}")))
}

fn float_cell(record: &csv::StringRecord, i: usize, line: usize) -> Result<f64> {
    cell(record, i, line)?
        .parse::<f64>()
        .map_err(|e| FeatureError::structural(format!("row {line}, column {i}: {e}")))
}

fn parse_row(record: &csv::StringRecord, depth: usize, line: usize) -> Result<FeatureRow> {
    let timestamp = cell(record, 0, line)?
        .parse::<i64>()
        .map_err(|e| FeatureError::structural(format!("row {line}, time: {e}")))?;

    let mut asks = Vec::with_capacity(depth);
    let mut bids = Vec::with_capacity(depth);
    for level in 0..depth {
        let base = 1 + level * 4;
        asks.push(Level::new(
            float_cell(record, base, line)?,
            float_cell(record, base + 1, line)?,
        ));
        bids.push(Level::new(
            float_cell(record, base + 2, line)?,
            float_cell(record, base + 3, line)?,
        ));
    }

    let mid_price = float_cell(record, 1 + depth * 4, line)?;
    let label = cell(record, 2 + depth * 4, line)?
        .parse::<u64>()
        .map_err(|e| FeatureError::structural(format!("row {line}, label: {e}")))?;

    Ok(FeatureRow::new(
        timestamp,
        LevelSet::from(asks),
        LevelSet::from(bids),
        mid_price,
        label,
    ))
}
