//! Classification: tree ensembles, stratified folds and the hyperparameter search.

pub mod forest;
pub mod search;
pub mod split;
pub mod tree;

pub use forest::{Forest, ForestParams};
pub use search::{CandidateResult, GridSearch, GridSearchResult, ParamGrid, SearchParams};
pub use split::{holdout_split, Fold, StratifiedKFold};
pub use tree::{DecisionTree, MaxFeatures, SplitMode, TreeParams};

use crate::source::types::Label;

/// Fraction of positions where `predicted` matches `actual`.
///
/// Returns 0.0 for empty input.
pub fn accuracy(predicted: &[Label], actual: &[Label]) -> f64 {
    let n = predicted.len().min(actual.len());
    if n == 0 {
        return 0.0;
    }
    let correct = predicted
        .iter()
        .zip(actual)
        .filter(|(p, a)| p == a)
        .count();
    correct as f64 / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[], &[]), 0.0);
        assert_eq!(accuracy(&[1, 2, 3, 4], &[1, 2, 0, 0]), 0.5);
        assert_eq!(accuracy(&[7, 7], &[7, 7]), 1.0);
    }
}
