//! Exhaustive hyperparameter search with stratified cross-validation.

use crate::error::{PipelineError, Result};
use crate::model::forest::{Forest, ForestParams};
use crate::model::split::StratifiedKFold;
use crate::source::types::Label;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// One point of the parameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub n_estimators: usize,
    pub min_samples_leaf: usize,
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{'min_samples_leaf': {}, 'n_estimators': {}}}",
            self.min_samples_leaf, self.n_estimators
        )
    }
}

/// Values to try for each searched hyperparameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![200, 250, 300],
            min_samples_leaf: vec![5, 10, 20, 40],
        }
    }
}

impl ParamGrid {
    /// Every combination, `min_samples_leaf` varying slowest.
    pub fn candidates(&self) -> Vec<SearchParams> {
        self.min_samples_leaf
            .iter()
            .flat_map(|&min_samples_leaf| {
                self.n_estimators.iter().map(move |&n_estimators| SearchParams {
                    n_estimators,
                    min_samples_leaf,
                })
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators.is_empty() || self.min_samples_leaf.is_empty() {
            return Err(PipelineError::parameters("parameter grid has an empty axis"));
        }
        if self.n_estimators.contains(&0) || self.min_samples_leaf.contains(&0) {
            return Err(PipelineError::parameters(
                "parameter grid values must be positive",
            ));
        }
        Ok(())
    }
}

/// Cross-validated outcome of one grid candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub params: SearchParams,
    pub fold_scores: Vec<f64>,
    pub mean_test_score: f64,
}

/// Everything the search produced, including the refitted best model.
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub best_params: SearchParams,
    pub best_score: f64,
    pub cv_results: Vec<CandidateResult>,
    pub best_estimator: Forest,
}

impl GridSearchResult {
    /// Mean of every candidate's mean fold score.
    pub fn mean_cv_accuracy(&self) -> f64 {
        if self.cv_results.is_empty() {
            return 0.0;
        }
        self.cv_results
            .iter()
            .map(|c| c.mean_test_score)
            .sum::<f64>()
            / self.cv_results.len() as f64
    }
}

/// Grid search over random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearch {
    pub grid: ParamGrid,
    pub cv_folds: usize,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self {
            grid: ParamGrid::default(),
            cv_folds: 5,
            bootstrap: true,
            seed: 0,
        }
    }
}

impl GridSearch {
    pub fn new(grid: ParamGrid, cv_folds: usize) -> Self {
        Self {
            grid,
            cv_folds,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    fn forest_params(&self, candidate: SearchParams) -> ForestParams {
        ForestParams {
            bootstrap: self.bootstrap,
            ..ForestParams::random_forest(
                candidate.n_estimators,
                candidate.min_samples_leaf,
                self.seed,
            )
        }
    }

    /// Score every candidate, then refit the best one on all of `x`.
    pub fn fit(&self, x: &[Vec<f64>], y: &[Label]) -> Result<GridSearchResult> {
        self.grid.validate()?;
        if x.len() != y.len() {
            return Err(PipelineError::length_mismatch(x.len(), y.len()));
        }
        let folds = StratifiedKFold::new(self.cv_folds).split(y)?;
        let candidates = self.grid.candidates();
        info!(
            candidates = candidates.len(),
            folds = folds.len(),
            rows = x.len(),
            "starting grid search"
        );

        let mut cv_results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let params = self.forest_params(candidate);
            let mut fold_scores = Vec::with_capacity(folds.len());
            for fold in &folds {
                let x_train: Vec<Vec<f64>> = fold.train.iter().map(|&i| x[i].clone()).collect();
                let y_train: Vec<Label> = fold.train.iter().map(|&i| y[i]).collect();
                let x_test: Vec<Vec<f64>> = fold.test.iter().map(|&i| x[i].clone()).collect();
                let y_test: Vec<Label> = fold.test.iter().map(|&i| y[i]).collect();

                let forest = Forest::fit(&x_train, &y_train, &params)?;
                fold_scores.push(forest.score(&x_test, &y_test));
            }
            let mean_test_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            debug!(%candidate, mean_test_score, "candidate scored");
            cv_results.push(CandidateResult {
                params: candidate,
                fold_scores,
                mean_test_score,
            });
        }

        // Strict > keeps the first candidate on ties
        let mut best = 0;
        for (i, result) in cv_results.iter().enumerate() {
            if result.mean_test_score > cv_results[best].mean_test_score {
                best = i;
            }
        }
        let best_params = cv_results[best].params;
        let best_score = cv_results[best].mean_test_score;
        let best_estimator = Forest::fit(x, y, &self.forest_params(best_params))?;

        info!(best = %best_params, best_score, "grid search finished");
        Ok(GridSearchResult {
            best_params,
            best_score,
            cv_results,
            best_estimator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_class_data() -> (Vec<Vec<f64>>, Vec<Label>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let label = if i % 2 == 0 { 1 } else { 2 };
            x.push(vec![label as f64 + (i as f64 * 0.01), label as f64 * 3.0 - (i as f64 * 0.02)]);
            y.push(label);
        }
        (x, y)
    }

    #[test]
    fn test_candidate_order() {
        let grid = ParamGrid {
            n_estimators: vec![200, 250],
            min_samples_leaf: vec![5, 10],
        };
        let candidates = grid.candidates();
        assert_eq!(
            candidates,
            vec![
                SearchParams { n_estimators: 200, min_samples_leaf: 5 },
                SearchParams { n_estimators: 250, min_samples_leaf: 5 },
                SearchParams { n_estimators: 200, min_samples_leaf: 10 },
                SearchParams { n_estimators: 250, min_samples_leaf: 10 },
            ]
        );
        assert_eq!(ParamGrid::default().candidates().len(), 12);
    }

    #[test]
    fn test_grid_validation() {
        let empty = ParamGrid {
            n_estimators: vec![],
            min_samples_leaf: vec![1],
        };
        assert!(empty.validate().is_err());

        let zero = ParamGrid {
            n_estimators: vec![10],
            min_samples_leaf: vec![0],
        };
        assert!(zero.validate().is_err());
        assert!(ParamGrid::default().validate().is_ok());
    }

    #[test]
    fn test_search_scores_every_candidate() {
        let (x, y) = two_class_data();
        let grid = ParamGrid {
            n_estimators: vec![5, 10],
            min_samples_leaf: vec![1, 2],
        };
        let result = GridSearch::new(grid, 4).with_seed(3).fit(&x, &y).unwrap();

        assert_eq!(result.cv_results.len(), 4);
        for candidate in &result.cv_results {
            assert_eq!(candidate.fold_scores.len(), 4);
        }
        // Both features separate the classes perfectly
        assert!((result.best_score - 1.0).abs() < 1e-9);
        assert_eq!(result.best_params, result.cv_results[0].params);
        assert!(result.mean_cv_accuracy() <= result.best_score);
        assert_eq!(result.best_estimator.score(&x, &y), 1.0);
    }

    #[test]
    fn test_too_many_folds() {
        let (x, y) = two_class_data();
        let search = GridSearch::new(ParamGrid::default(), 100);
        assert!(search.fit(&x, &y).is_err());
    }

    #[test]
    fn test_params_display() {
        let params = SearchParams {
            n_estimators: 250,
            min_samples_leaf: 10,
        };
        assert_eq!(
            params.to_string(),
            "{'min_samples_leaf': 10, 'n_estimators': 250}"
        );
    }
}
