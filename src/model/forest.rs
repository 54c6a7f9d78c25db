//! Tree ensembles: random forests and extremely randomised trees.

use crate::error::{PipelineError, Result};
use crate::model::tree::{DecisionTree, MaxFeatures, SplitMode, TreeParams};
use crate::model::accuracy;
use crate::source::types::Label;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Hyperparameters for a tree ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub split_mode: SplitMode,
    pub bootstrap: bool,
    pub max_depth: Option<usize>,
    pub seed: u64,
}

impl ForestParams {
    /// Bootstrapped CART trees with best splits over `sqrt(n_features)` candidates.
    pub fn random_forest(n_estimators: usize, min_samples_leaf: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            min_samples_leaf,
            max_features: MaxFeatures::Sqrt,
            split_mode: SplitMode::Best,
            bootstrap: true,
            max_depth: None,
            seed,
        }
    }

    /// Randomised-threshold trees on the full sample, used for importance ranking.
    pub fn extra_trees(n_estimators: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            split_mode: SplitMode::Random,
            bootstrap: false,
            max_depth: None,
            seed,
        }
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
            split_mode: self.split_mode,
            max_depth: self.max_depth,
        }
    }
}

/// A fitted ensemble of classification trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forest {
    params: ForestParams,
    classes: Vec<Label>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl Forest {
    /// Fit the ensemble on a feature matrix and labels.
    pub fn fit(x: &[Vec<f64>], y: &[Label], params: &ForestParams) -> Result<Self> {
        if x.is_empty() {
            return Err(PipelineError::insufficient("cannot fit on an empty table"));
        }
        if x.len() != y.len() {
            return Err(PipelineError::length_mismatch(x.len(), y.len()));
        }
        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
            return Err(PipelineError::parameters(
                "feature rows must be non-empty and of equal width",
            ));
        }
        if params.n_estimators == 0 || params.min_samples_leaf == 0 {
            return Err(PipelineError::parameters(
                "n_estimators and min_samples_leaf must be positive",
            ));
        }

        let mut classes: Vec<Label> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let encoded: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = x.len();
        let tree_params = params.tree_params();
        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let indices: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| tree_rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit(x, &encoded, classes.len(), indices, tree_params, &mut tree_rng)
            })
            .collect();

        Ok(Forest {
            params: *params,
            classes,
            n_features,
            trees,
        })
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Class labels in probability-column order.
    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean class probabilities across trees.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(row)) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        proba
    }

    /// Most probable label for one row; ties go to the lowest label.
    pub fn predict_one(&self, row: &[f64]) -> Label {
        let proba = self.predict_proba(row);
        let mut best = 0;
        for (i, &p) in proba.iter().enumerate() {
            if p > proba[best] {
                best = i;
            }
        }
        self.classes[best]
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<Label> {
        x.iter().map(|row| self.predict_one(row)).collect()
    }

    /// Fraction of rows predicted correctly.
    pub fn score(&self, x: &[Vec<f64>], y: &[Label]) -> f64 {
        accuracy(&self.predict(x), y)
    }

    /// Mean decrease in impurity per feature, averaged over trees and normalised.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut importances = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (acc, v) in importances.iter_mut().zip(tree.feature_importances()) {
                *acc += v;
            }
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }
        importances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three classes separated on feature 2, features 0 and 1 are noise.
    fn three_class_data(n: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<Label>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..n {
            let label = (i % 3) as Label + 1;
            x.push(vec![
                rng.gen_range(0.0..1.0),
                rng.gen_range(-5.0..5.0),
                label as f64 * 10.0 + rng.gen_range(-2.0..2.0),
            ]);
            y.push(label);
        }
        (x, y)
    }

    #[test]
    fn test_random_forest_learns_separable_classes() {
        let (x, y) = three_class_data(90, 11);
        let params = ForestParams::random_forest(25, 1, 7);
        let forest = Forest::fit(&x, &y, &params).unwrap();

        assert_eq!(forest.classes(), &[1, 2, 3]);
        assert!(forest.score(&x, &y) > 0.95);

        let (x_new, y_new) = three_class_data(30, 12);
        assert!(forest.score(&x_new, &y_new) > 0.9);
    }

    #[test]
    fn test_importances_favour_informative_feature() {
        let (x, y) = three_class_data(120, 11);
        let forest = Forest::fit(&x, &y, &ForestParams::extra_trees(50, 3)).unwrap();
        let importances = forest.feature_importances();

        assert_eq!(importances.len(), 3);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[2] > importances[0]);
        assert!(importances[2] > importances[1]);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let (x, y) = three_class_data(60, 11);
        let params = ForestParams::random_forest(10, 2, 99);
        let a = Forest::fit(&x, &y, &params).unwrap();
        let b = Forest::fit(&x, &y, &params).unwrap();
        for row in &x {
            assert_eq!(a.predict_proba(row), b.predict_proba(row));
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = three_class_data(45, 11);
        let forest = Forest::fit(&x, &y, &ForestParams::random_forest(8, 3, 1)).unwrap();
        for row in &x {
            let total: f64 = forest.predict_proba(row).iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let params = ForestParams::random_forest(5, 1, 0);
        assert!(Forest::fit(&[], &[], &params).is_err());
        assert!(Forest::fit(&[vec![1.0]], &[1, 2], &params).is_err());
        assert!(Forest::fit(&[vec![1.0], vec![1.0, 2.0]], &[1, 2], &params).is_err());

        let zero_trees = ForestParams::random_forest(0, 1, 0);
        assert!(Forest::fit(&[vec![1.0]], &[1], &zero_trees).is_err());
    }

    #[test]
    fn test_single_class() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![4, 4, 4];
        let forest = Forest::fit(&x, &y, &ForestParams::random_forest(3, 1, 0)).unwrap();
        assert_eq!(forest.predict(&x), vec![4, 4, 4]);
        assert_eq!(forest.feature_importances(), vec![0.0]);
    }
}
