//! Importance-ranked column trimming.
//!
//! An extra-trees ensemble is fitted on the full feature table and each
//! column is scored by its normalised mean decrease in impurity. The
//! strategy then decides which columns survive. Surviving columns keep the
//! order they had in the input table.

use crate::core::extraction::FeatureTable;
use crate::error::{PipelineError, Result};
use crate::model::forest::{Forest, ForestParams};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How many ranked columns to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Keep the `k` highest-ranked columns (all of them if `k` exceeds the width)
    TopK(usize),
    /// Keep columns whose importance is at least the mean importance
    MeanImportance,
}

impl Default for SelectionStrategy {
    fn default() -> Self {
        SelectionStrategy::TopK(12)
    }
}

/// Columns chosen by a [`FeatureSelector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedFeatures {
    /// Indices into the input table's columns, ascending
    pub indices: Vec<usize>,
    /// Importance of every input column
    pub importances: Vec<f64>,
    /// Names of the kept columns
    pub names: Vec<String>,
}

impl SelectedFeatures {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Trim a table that has the same columns the selection was fitted on.
    pub fn apply(&self, table: &FeatureTable) -> Result<FeatureTable> {
        if table.n_columns() != self.importances.len() {
            return Err(PipelineError::parameters(format!(
                "selection fitted on {} columns, table has {}",
                self.importances.len(),
                table.n_columns()
            )));
        }
        Ok(table.select_columns(&self.indices))
    }
}

/// Fits the ranking ensemble and picks columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSelector {
    pub strategy: SelectionStrategy,
    pub n_estimators: usize,
    pub seed: u64,
}

impl Default for FeatureSelector {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::default(),
            n_estimators: 50,
            seed: 0,
        }
    }
}

impl FeatureSelector {
    pub fn new(strategy: SelectionStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn with_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fit(&self, table: &FeatureTable) -> Result<SelectedFeatures> {
        if table.is_empty() {
            return Err(PipelineError::insufficient(
                "cannot select features from an empty table",
            ));
        }
        let ranker = Forest::fit(
            &table.matrix(),
            &table.labels,
            &ForestParams::extra_trees(self.n_estimators, self.seed),
        )?;
        let importances = ranker.feature_importances();
        let indices = self.choose(&importances);

        for &i in &indices {
            debug!(column = %table.columns[i], importance = importances[i], "column kept");
        }
        info!(
            before = table.n_columns(),
            after = indices.len(),
            "feature selection done"
        );

        Ok(SelectedFeatures {
            names: indices.iter().map(|&i| table.columns[i].clone()).collect(),
            indices,
            importances,
        })
    }

    /// Fit and trim in one step.
    pub fn fit_transform(&self, table: &FeatureTable) -> Result<(SelectedFeatures, FeatureTable)> {
        let selected = self.fit(table)?;
        let trimmed = selected.apply(table)?;
        Ok((selected, trimmed))
    }

    fn choose(&self, importances: &[f64]) -> Vec<usize> {
        let mut indices = match self.strategy {
            SelectionStrategy::TopK(k) => {
                let mut ranked: Vec<usize> = (0..importances.len()).collect();
                // Stable sort keeps the earlier column on equal importance
                ranked.sort_by(|&a, &b| importances[b].total_cmp(&importances[a]));
                ranked.truncate(k.max(1));
                ranked
            }
            SelectionStrategy::MeanImportance => {
                if importances.is_empty() {
                    return Vec::new();
                }
                let mean = importances.iter().sum::<f64>() / importances.len() as f64;
                (0..importances.len())
                    .filter(|&i| importances[i] >= mean)
                    .collect()
            }
        };
        indices.sort_unstable();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extraction::FeatureRow;
    use chrono::Utc;

    /// Column 1 carries the label, the rest are deterministic noise.
    fn table(n_columns: usize) -> FeatureTable {
        let now = Utc::now();
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..60 {
            let label = (i % 2) as u32 + 1;
            let values = (0..n_columns)
                .map(|c| {
                    if c == 1 {
                        label as f64 * 5.0 + (i % 3) as f64 * 0.1
                    } else {
                        ((i * 7 + c * 13) % 11) as f64
                    }
                })
                .collect();
            rows.push(FeatureRow { timestamp: now, values });
            labels.push(label);
        }
        FeatureTable {
            columns: (0..n_columns).map(|c| format!("f{c}")).collect(),
            rows,
            labels,
        }
    }

    #[test]
    fn test_top_k_keeps_informative_column() {
        let table = table(6);
        let selector = FeatureSelector::new(SelectionStrategy::TopK(2)).with_seed(4);
        let (selected, trimmed) = selector.fit_transform(&table).unwrap();

        assert_eq!(selected.len(), 2);
        assert!(selected.indices.contains(&1));
        assert!(selected.indices.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(trimmed.n_columns(), 2);
        assert_eq!(trimmed.n_rows(), table.n_rows());
        assert_eq!(trimmed.labels, table.labels);
    }

    #[test]
    fn test_selection_never_grows() {
        let table = table(4);
        for strategy in [
            SelectionStrategy::TopK(100),
            SelectionStrategy::TopK(0),
            SelectionStrategy::MeanImportance,
        ] {
            let selected = FeatureSelector::new(strategy)
                .with_estimators(10)
                .fit(&table)
                .unwrap();
            assert!(selected.len() <= table.n_columns());
            assert!(selected.indices.iter().all(|&i| i < table.n_columns()));
        }
    }

    #[test]
    fn test_top_zero_keeps_best_column() {
        let table = table(4);
        let (selected, trimmed) = FeatureSelector::new(SelectionStrategy::TopK(0))
            .with_estimators(10)
            .fit_transform(&table)
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(trimmed.n_columns(), 1);
        assert_eq!(trimmed.n_rows(), table.n_rows());
    }

    #[test]
    fn test_mean_importance_keeps_informative_column() {
        let table = table(5);
        let selected = FeatureSelector::new(SelectionStrategy::MeanImportance)
            .with_seed(9)
            .fit(&table)
            .unwrap();
        assert!(!selected.is_empty());
        assert!(selected.indices.contains(&1));
    }

    #[test]
    fn test_apply_rejects_other_width() {
        let selected = FeatureSelector::new(SelectionStrategy::TopK(2))
            .fit(&table(4))
            .unwrap();
        assert!(selected.apply(&table(5)).is_err());
    }

    #[test]
    fn test_empty_table() {
        assert!(FeatureSelector::default().fit(&FeatureTable::default()).is_err());
    }

    #[test]
    fn test_strategy_serde() {
        let json = serde_json::to_string(&SelectionStrategy::TopK(12)).unwrap();
        assert_eq!(json, r#"{"top_k":12}"#);
        let parsed: SelectionStrategy = serde_json::from_str(r#""mean_importance""#).unwrap();
        assert_eq!(parsed, SelectionStrategy::MeanImportance);
    }
}
