//! Stratified k-fold partitioning without shuffling.
//!
//! Each class is spread across folds in proportion to its frequency, and
//! within a class the earliest rows go to fold 0, the next to fold 1, and so
//! on, so every fold keeps the original (temporal) order of its rows.

use crate::error::{PipelineError, Result};
use crate::source::types::Label;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Train/test row indices for one fold, both ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified k-fold splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratifiedKFold {
    pub n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    /// Fold number assigned to every row.
    pub fn assign(&self, y: &[Label]) -> Result<Vec<usize>> {
        let k = self.n_splits;
        if k < 2 {
            return Err(PipelineError::folds(format!(
                "n_splits must be at least 2, got {k}"
            )));
        }
        if k > y.len() {
            return Err(PipelineError::folds(format!(
                "cannot have n_splits={k} greater than the number of rows ({})",
                y.len()
            )));
        }

        let mut classes: Vec<Label> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let encoded: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        let mut class_counts = vec![0usize; classes.len()];
        for &c in &encoded {
            class_counts[c] += 1;
        }
        if class_counts.iter().all(|&count| count < k) {
            return Err(PipelineError::folds(format!(
                "n_splits={k} cannot be greater than the number of members in each class"
            )));
        }
        if let Some(&smallest) = class_counts.iter().min() {
            if smallest < k {
                warn!(
                    smallest,
                    n_splits = k,
                    "least populated class has fewer members than folds"
                );
            }
        }

        // Deal the sorted labels round-robin to get per-fold class allocations
        let mut sorted = encoded.clone();
        sorted.sort_unstable();
        let mut allocation = vec![vec![0usize; classes.len()]; k];
        for (i, &c) in sorted.iter().enumerate() {
            allocation[i % k][c] += 1;
        }

        // Within each class, hand out rows in order: fold 0 first, then fold 1, ...
        let mut next_fold = vec![0usize; classes.len()];
        let mut used = vec![0usize; classes.len()];
        let mut assignment = Vec::with_capacity(y.len());
        for &c in &encoded {
            while used[c] >= allocation[next_fold[c]][c] {
                used[c] = 0;
                next_fold[c] += 1;
            }
            assignment.push(next_fold[c]);
            used[c] += 1;
        }
        Ok(assignment)
    }

    /// All folds, in fold order.
    pub fn split(&self, y: &[Label]) -> Result<Vec<Fold>> {
        let assignment = self.assign(y)?;
        Ok((0..self.n_splits)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..y.len()).partition(|&i| assignment[i] == fold);
                Fold { train, test }
            })
            .collect())
    }
}

/// Hold-out partition: the first fold of an unshuffled stratified split.
pub fn holdout_split(y: &[Label], n_splits: usize) -> Result<Fold> {
    StratifiedKFold::new(n_splits)
        .split(y)?
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::folds("no folds produced"))
}
