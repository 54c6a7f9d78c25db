//! CSV loader for labelled accelerometer recordings.
//!
//! Expected layout, with a header row:
//!
//! ```text
//! timestamp,x,y,z,label
//! 2024-01-22T10:00:00.000Z,0.01,-0.02,0.98,1
//! 1705917600020,0.02,-0.01,0.97,1
//! ```
//!
//! Timestamps are either RFC 3339 strings or Unix epoch milliseconds.

use crate::error::{PipelineError, Result};
use crate::source::types::{AccelSample, Label, RawSeries};
use crate::source::DataSource;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    timestamp: String,
    x: f64,
    y: f64,
    z: f64,
    label: Label,
}

/// Reads a [`RawSeries`] from a CSV file.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for CsvSource {
    fn load(&mut self) -> Result<RawSeries> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;
        let series = read_series(reader)?;
        info!(
            path = %self.path.display(),
            samples = series.len(),
            "loaded accelerometer recording"
        );
        Ok(series)
    }
}

/// Parse every record of an already-open CSV reader.
pub fn read_series<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<RawSeries> {
    let mut samples = Vec::new();
    let mut labels = Vec::new();

    for (row_idx, result) in reader.deserialize::<CsvRecord>().enumerate() {
        let record = result?;
        let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| {
            PipelineError::InvalidTimestamp {
                row: row_idx + 1,
                value: record.timestamp.clone(),
            }
        })?;
        samples.push(AccelSample::new(timestamp, record.x, record.y, record.z));
        labels.push(record.label);
    }

    RawSeries::new(samples, labels)
}

/// Parse an RFC 3339 timestamp or integer epoch milliseconds.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(millis) = value.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
