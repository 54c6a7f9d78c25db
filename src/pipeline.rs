//! End-to-end orchestration: raw series in, scores and summaries out.

use crate::config::Config;
use crate::core::extraction::{extract_feature_table, FeatureTable};
use crate::core::selection::SelectedFeatures;
use crate::error::{PipelineError, Result};
use crate::metrics::{ActivityMetrics, Granularity, SummaryTable};
use crate::model::search::GridSearchResult;
use crate::model::split::{holdout_split, Fold};
use crate::report::RunReport;
use crate::source::types::RawSeries;
use chrono::Duration;
use tracing::info;

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Feature table after selection, all rows
    pub features: FeatureTable,
    pub selected: SelectedFeatures,
    /// Row indices of the train/test partition
    pub split: Fold,
    pub search: GridSearchResult,
    /// Accuracy of the refitted model on the held-out rows
    pub test_accuracy: f64,
    pub hourly: SummaryTable,
    pub daily: SummaryTable,
    pub report: RunReport,
}

/// Runs every stage with one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Windowed features for the whole series, before selection.
    pub fn extract(&self, series: &RawSeries) -> Result<FeatureTable> {
        extract_feature_table(series, &self.config.window_spec()?, &self.config.features)
    }

    pub fn run(&self, series: &RawSeries) -> Result<PipelineOutput> {
        let mut report = RunReport::new();
        info!(run_id = %report.run_id, samples = series.len(), "pipeline started");

        let table = self.extract(series)?;
        report.record_extraction(series.len(), table.n_rows(), table.n_columns());
        if table.n_rows() < self.config.search.holdout_folds {
            return Err(PipelineError::insufficient(format!(
                "{} windows extracted, need at least {}",
                table.n_rows(),
                self.config.search.holdout_folds
            )));
        }

        let (selected, features) = self.config.selection.selector().fit_transform(&table)?;
        report.record_selection(&selected.names);

        let split = holdout_split(&features.labels, self.config.search.holdout_folds)?;
        report.record_split(split.train.len(), split.test.len());
        let train = features.select_rows(&split.train);
        let test = features.select_rows(&split.test);

        let search = self
            .config
            .search
            .grid_search()
            .fit(&train.matrix(), &train.labels)?;
        report.record_search(
            search.cv_results.len(),
            search.best_params,
            search.best_score,
            search.mean_cv_accuracy(),
        );

        let test_accuracy = search.best_estimator.score(&test.matrix(), &test.labels);
        report.record_test_accuracy(test_accuracy);
        info!(test_accuracy, "held-out partition scored");

        // Summaries describe the held-out partition with its true labels
        let timestamps = test.timestamps();
        let epoch = Duration::from_std(self.config.epoch())
            .map_err(|e| PipelineError::parameters(e.to_string()))?;
        let kinds = &self.config.metrics.metrics;
        let summarise = |granularity| -> Result<SummaryTable> {
            Ok(
                ActivityMetrics::new(&test.labels, &timestamps, granularity, &self.config.metrics)?
                    .with_epoch(epoch)
                    .run_metric_array(kinds),
            )
        };
        let hourly = summarise(Granularity::Hourly)?;
        let daily = summarise(Granularity::Daily)?;

        report.finish();
        info!(
            run_id = %report.run_id,
            duration_secs = report.duration_secs(),
            "pipeline finished"
        );

        Ok(PipelineOutput {
            features,
            selected,
            split,
            search,
            test_accuracy,
            hourly,
            daily,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::synthetic::SyntheticSource;

    #[test]
    fn test_too_few_windows() {
        // 1000 samples at 50 Hz give two windows: one per partition, too few to cross-validate
        let series = SyntheticSource::new(50, 1000).generate().unwrap();
        let pipeline = Pipeline::new(Config::default());
        assert_eq!(pipeline.extract(&series).unwrap().n_rows(), 2);
        assert!(pipeline.run(&series).is_err());

        let series = SyntheticSource::new(50, 100).generate().unwrap();
        assert!(matches!(
            pipeline.run(&series),
            Err(PipelineError::InsufficientData(_))
        ));
    }
}
