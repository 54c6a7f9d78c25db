//! Per-run bookkeeping.
//!
//! Stages record what they consumed and produced as the pipeline advances;
//! the finished report is printed by the CLI and returned with the output.

use crate::model::search::SearchParams;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Counters and scores collected during one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Raw samples read from the source
    pub samples: u64,
    /// Windows extracted
    pub windows: u64,
    /// Feature columns before and after selection
    pub columns_extracted: u64,
    pub columns_selected: u64,
    /// Names of the columns that survived selection
    pub selected_features: Vec<String>,
    pub train_rows: u64,
    pub test_rows: u64,
    /// Grid candidates scored
    pub candidates: u64,
    pub best_params: Option<SearchParams>,
    /// Mean fold accuracy of the best candidate
    pub best_cv_accuracy: Option<f64>,
    /// Mean of every candidate's mean fold accuracy
    pub cv_accuracy: Option<f64>,
    /// Accuracy of the refitted model on the held-out partition
    pub test_accuracy: Option<f64>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            samples: 0,
            windows: 0,
            columns_extracted: 0,
            columns_selected: 0,
            selected_features: Vec::new(),
            train_rows: 0,
            test_rows: 0,
            candidates: 0,
            best_params: None,
            best_cv_accuracy: None,
            cv_accuracy: None,
            test_accuracy: None,
        }
    }

    pub fn record_extraction(&mut self, samples: usize, windows: usize, columns: usize) {
        self.samples = samples as u64;
        self.windows = windows as u64;
        self.columns_extracted = columns as u64;
    }

    pub fn record_selection(&mut self, names: &[String]) {
        self.columns_selected = names.len() as u64;
        self.selected_features = names.to_vec();
    }

    pub fn record_split(&mut self, train_rows: usize, test_rows: usize) {
        self.train_rows = train_rows as u64;
        self.test_rows = test_rows as u64;
    }

    pub fn record_search(
        &mut self,
        candidates: usize,
        best_params: SearchParams,
        best_cv_accuracy: f64,
        cv_accuracy: f64,
    ) {
        self.candidates = candidates as u64;
        self.best_params = Some(best_params);
        self.best_cv_accuracy = Some(best_cv_accuracy);
        self.cv_accuracy = Some(cv_accuracy);
    }

    pub fn record_test_accuracy(&mut self, accuracy: f64) {
        self.test_accuracy = Some(accuracy);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration, up to now if the run is still going.
    pub fn duration_secs(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let best = self
            .best_params
            .map_or_else(|| "n/a".to_string(), |p| p.to_string());
        format!(
            "Best parameters are: {}\n\
             CV accuracy {}\n\
             Train / test split accuracy {}\n\
             \n\
             Run {}:\n\
             - Samples read: {}\n\
             - Windows extracted: {}\n\
             - Feature columns: {} extracted, {} selected\n\
             - Rows: {} train, {} test\n\
             - Candidates scored: {}\n\
             - Duration: {:.1} seconds",
            best,
            format_score(self.cv_accuracy),
            format_score(self.test_accuracy),
            self.run_id,
            self.samples,
            self.windows,
            self.columns_extracted,
            self.columns_selected,
            self.train_rows,
            self.test_rows,
            self.candidates,
            self.duration_secs()
        )
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "n/a".to_string(), |s| format!("{s:.4}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_recording() {
        let mut report = RunReport::new();
        report.record_extraction(1000, 2, 27);
        report.record_selection(&["energy_x".to_string(), "kurtosis_z".to_string()]);
        report.record_split(1, 1);

        assert_eq!(report.samples, 1000);
        assert_eq!(report.windows, 2);
        assert_eq!(report.columns_extracted, 27);
        assert_eq!(report.columns_selected, 2);
        assert_eq!(report.train_rows + report.test_rows, report.windows);
        assert!(report.finished_at.is_none());

        report.finish();
        assert!(report.finished_at.is_some());
        assert!(report.duration_secs() >= 0.0);
    }

    #[test]
    fn test_summary_format() {
        let mut report = RunReport::new();
        report.record_search(
            12,
            SearchParams {
                n_estimators: 200,
                min_samples_leaf: 5,
            },
            0.93,
            0.9,
        );
        report.record_test_accuracy(0.875);
        let summary = report.summary();

        assert!(summary.starts_with("Best parameters are: {'min_samples_leaf': 5"));
        assert!(summary.contains("CV accuracy 0.9000"));
        assert!(summary.contains("Train / test split accuracy 0.8750"));
        assert!(summary.contains("Candidates scored: 12"));
    }

    #[test]
    fn test_summary_before_search() {
        let summary = RunReport::new().summary();
        assert!(summary.contains("Best parameters are: n/a"));
        assert!(summary.contains("CV accuracy n/a"));
    }

    #[test]
    fn test_unique_run_ids() {
        assert_ne!(RunReport::new().run_id, RunReport::new().run_id);
    }
}
