//! The window loop: raw labelled series in, feature table out.

use crate::core::features::{feature_names, FeatureExtractor, FeatureFunction};
use crate::core::windowing::{Cursor, Slide, WindowSpec};
use crate::error::{PipelineError, Result};
use crate::source::types::{Label, RawSeries};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One row of the feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Representative timestamp (last sample of the window)
    pub timestamp: DateTime<Utc>,
    /// Feature values, function-major then axis
    pub values: Vec<f64>,
}

impl FeatureRow {
    /// Width of the row including the timestamp column.
    pub fn width(&self) -> usize {
        1 + self.values.len()
    }
}

/// Windowed features with one majority label per row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
    pub labels: Vec<Label>,
}

impl FeatureTable {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of feature columns, not counting the timestamp.
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature values without timestamps, one `Vec` per row.
    pub fn matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.values.clone()).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    /// Keep only the given columns, in the given order.
    pub fn select_columns(&self, indices: &[usize]) -> FeatureTable {
        FeatureTable {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| FeatureRow {
                    timestamp: row.timestamp,
                    values: indices.iter().map(|&i| row.values[i]).collect(),
                })
                .collect(),
            labels: self.labels.clone(),
        }
    }

    /// Keep only the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> FeatureTable {
        FeatureTable {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Most frequent label; ties go to the lowest label value.
pub fn majority_label(labels: &[Label]) -> Option<Label> {
    let mut counts: BTreeMap<Label, usize> = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut best: Option<(Label, usize)> = None;
    for (label, count) in counts {
        // BTreeMap iterates in ascending order, so strict > keeps the lowest on ties
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}

/// Slide over the series and build the feature table.
pub fn extract_feature_table(
    series: &RawSeries,
    spec: &WindowSpec,
    functions: &[FeatureFunction],
) -> Result<FeatureTable> {
    series.validate()?;
    if functions.is_empty() {
        return Err(PipelineError::parameters("no feature functions configured"));
    }

    let mut extractor = FeatureExtractor::new(functions);
    let mut table = FeatureTable {
        columns: feature_names(functions),
        rows: Vec::with_capacity(spec.window_count(series.len())),
        labels: Vec::with_capacity(spec.window_count(series.len())),
    };

    let mut cursor = Cursor::start();
    loop {
        let (bounds, window, next) = match spec.slide(&series.samples, cursor) {
            Slide::Window {
                bounds,
                samples,
                next,
            } => (bounds, samples, next),
            Slide::End => break,
        };

        let window_labels = spec
            .peek(&series.labels, cursor)
            .ok_or_else(|| PipelineError::length_mismatch(series.len(), series.labels.len()))?;
        let label = majority_label(window_labels)
            .ok_or_else(|| PipelineError::insufficient("empty label window"))?;

        table.rows.push(FeatureRow {
            timestamp: series.samples[bounds.last()].timestamp,
            values: extractor.extract(window),
        });
        table.labels.push(label);

        debug!(start = bounds.start, end = bounds.end, label, "window extracted");
        cursor = next;
    }

    info!(
        samples = series.len(),
        windows = table.n_rows(),
        columns = table.n_columns(),
        "feature table built"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::DEFAULT_FEATURES;
    use crate::source::synthetic::SyntheticSource;
    use crate::source::types::AccelSample;
    use chrono::Duration;

    fn series_with_labels(labels: Vec<Label>) -> RawSeries {
        let start = Utc::now();
        let samples = (0..labels.len())
            .map(|i| {
                AccelSample::new(
                    start + Duration::milliseconds(20 * i as i64),
                    (i as f64).sin(),
                    (i as f64).cos(),
                    1.0,
                )
            })
            .collect();
        RawSeries::new(samples, labels).unwrap()
    }

    #[test]
    fn test_majority_label() {
        assert_eq!(majority_label(&[]), None);
        assert_eq!(majority_label(&[3, 3, 1]), Some(3));
        assert_eq!(majority_label(&[2, 5, 5, 2]), Some(2));
        assert_eq!(majority_label(&[9, 4, 7]), Some(4));
    }

    #[test]
    fn test_window_labels_follow_majority() {
        // Windows of 4 with overlap 1: [0..4), [3..7), [6..10)
        let labels = vec![1, 1, 2, 2, 2, 2, 3, 3, 2, 3];
        let series = series_with_labels(labels);
        let spec = WindowSpec::new(4, 1).unwrap();
        let table = extract_feature_table(&series, &spec, &DEFAULT_FEATURES).unwrap();

        assert_eq!(table.n_rows(), 3);
        // [1,1,2,2] ties -> lowest, [2,2,2,3] -> 2, [3,3,2,3] -> 3
        assert_eq!(table.labels, vec![1, 2, 3]);
    }

    #[test]
    fn test_row_width_and_timestamp() {
        let series = series_with_labels(vec![0; 12]);
        let spec = WindowSpec::new(5, 2).unwrap();
        let table = extract_feature_table(&series, &spec, &DEFAULT_FEATURES).unwrap();

        assert_eq!(table.n_columns(), DEFAULT_FEATURES.len() * 3);
        for row in &table.rows {
            assert_eq!(row.width(), 1 + DEFAULT_FEATURES.len() * 3);
        }
        assert_eq!(table.rows[0].timestamp, series.samples[4].timestamp);
        assert_eq!(table.rows[1].timestamp, series.samples[7].timestamp);
    }

    #[test]
    fn test_short_series_yields_empty_table() {
        let series = series_with_labels(vec![1; 3]);
        let spec = WindowSpec::new(5, 1).unwrap();
        let table = extract_feature_table(&series, &spec, &DEFAULT_FEATURES).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut series = series_with_labels(vec![1; 10]);
        series.labels.pop();
        let spec = WindowSpec::new(5, 1).unwrap();
        assert!(extract_feature_table(&series, &spec, &DEFAULT_FEATURES).is_err());
    }

    #[test]
    fn test_ten_second_windows_at_fifty_hz() {
        let spec = WindowSpec::from_seconds(50, 10, 1).unwrap();

        let series = SyntheticSource::new(50, 500).generate().unwrap();
        let table = extract_feature_table(&series, &spec, &DEFAULT_FEATURES).unwrap();
        assert_eq!(table.n_rows(), 1);

        let series = SyntheticSource::new(50, 1000).generate().unwrap();
        let table = extract_feature_table(&series, &spec, &DEFAULT_FEATURES).unwrap();
        assert_eq!(table.n_rows(), 2);
    }

    #[test]
    fn test_select_columns_and_rows() {
        let series = series_with_labels(vec![1, 1, 1, 2, 2, 2, 3, 3, 3]);
        let spec = WindowSpec::new(3, 0).unwrap();
        let table = extract_feature_table(&series, &spec, &DEFAULT_FEATURES).unwrap();

        let trimmed = table.select_columns(&[0, 5]);
        assert_eq!(trimmed.columns, vec![table.columns[0].clone(), table.columns[5].clone()]);
        assert_eq!(trimmed.rows[2].values[1], table.rows[2].values[5]);

        let subset = table.select_rows(&[2, 0]);
        assert_eq!(subset.labels, vec![3, 1]);
    }
}
