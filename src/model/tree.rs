//! CART classification tree with Gini impurity.
//!
//! Trees are grown on an index set into a shared feature matrix so that the
//! ensemble can hand each tree its own bootstrap sample without copying rows.
//! Two split searches are supported: exhaustive over midpoints between
//! distinct sorted values, and a single uniformly drawn threshold per
//! candidate feature (extremely randomised trees).

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How split thresholds are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    Best,
    Random,
}

/// How many features are considered at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
    Count(usize),
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Count(k) => k,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Growth parameters for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub split_mode: SplitMode,
    pub max_depth: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            split_mode: SplitMode::Best,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        /// Class probabilities at this leaf
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    /// Weighted child impurity, `n_left * gini_left + n_right * gini_right`
    weighted_impurity: f64,
}

/// A fitted classification tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    root: usize,
    n_classes: usize,
    /// Unnormalised total impurity decrease per feature
    importances: Vec<f64>,
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    n_features: usize,
    params: TreeParams,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `indices` (duplicates allowed).
    ///
    /// `y` holds class indices in `0..n_classes`.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        indices: Vec<usize>,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = x.first().map_or(0, |row| row.len());
        let mut builder = Builder {
            x,
            y,
            n_classes,
            n_features,
            params,
            rng,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        let root = builder.build(indices, 0);

        DecisionTree {
            nodes: builder.nodes,
            root,
            n_classes,
            importances: builder.importances,
        }
    }

    /// Class probabilities for one row.
    pub fn predict_proba(&self, row: &[f64]) -> &[f64] {
        let mut idx = self.root;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Impurity decrease per feature, normalised to sum to 1 (all zero for a stump).
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.importances.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.importances.len()];
        }
        self.importances.iter().map(|v| v / total).collect()
    }
}

impl Builder<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let counts = self.class_counts(&indices);
        let n = indices.len();
        let impurity = gini(&counts, n);

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        let too_small = n < 2 * self.params.min_samples_leaf.max(1);
        if impurity <= 0.0 || depth_reached || too_small || self.n_features == 0 {
            return self.leaf(&counts, n);
        }

        let Some(best) = self.find_split(&indices) else {
            return self.leaf(&counts, n);
        };
        let decrease = n as f64 * impurity - best.weighted_impurity;
        if decrease <= 1e-12 {
            return self.leaf(&counts, n);
        }
        self.importances[best.feature] += decrease;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][best.feature] <= best.threshold);

        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);
        self.nodes.push(Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        });
        self.nodes.len() - 1
    }

    fn leaf(&mut self, counts: &[usize], n: usize) -> usize {
        let distribution = counts
            .iter()
            .map(|&c| if n == 0 { 0.0 } else { c as f64 / n as f64 })
            .collect();
        self.nodes.push(Node::Leaf { distribution });
        self.nodes.len() - 1
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn find_split(&mut self, indices: &[usize]) -> Option<Candidate> {
        let k = self.params.max_features.resolve(self.n_features);
        let features = rand::seq::index::sample(&mut *self.rng, self.n_features, k);

        let mut best: Option<Candidate> = None;
        for feature in features.iter() {
            let candidate = match self.params.split_mode {
                SplitMode::Best => self.best_threshold(indices, feature),
                SplitMode::Random => self.random_threshold(indices, feature),
            };
            if let Some(c) = candidate {
                if best.map_or(true, |b| c.weighted_impurity < b.weighted_impurity) {
                    best = Some(c);
                }
            }
        }
        best
    }

    fn best_threshold(&self, indices: &[usize], feature: usize) -> Option<Candidate> {
        let min_leaf = self.params.min_samples_leaf.max(1);
        let n = indices.len();

        let mut sorted: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (self.x[i][feature], self.y[i]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left = vec![0usize; self.n_classes];
        let mut right = vec![0usize; self.n_classes];
        for &(_, class) in &sorted {
            right[class] += 1;
        }

        let mut best: Option<Candidate> = None;
        for split in 1..n {
            let (value, class) = sorted[split - 1];
            left[class] += 1;
            right[class] -= 1;

            if split < min_leaf || n - split < min_leaf {
                continue;
            }
            let next = sorted[split].0;
            if next <= value {
                continue;
            }

            let weighted =
                split as f64 * gini(&left, split) + (n - split) as f64 * gini(&right, n - split);
            if best.map_or(true, |b| weighted < b.weighted_impurity) {
                best = Some(Candidate {
                    feature,
                    threshold: midpoint(value, next),
                    weighted_impurity: weighted,
                });
            }
        }
        best
    }

    fn random_threshold(&mut self, indices: &[usize], feature: usize) -> Option<Candidate> {
        let min_leaf = self.params.min_samples_leaf.max(1);
        let (lo, hi) = indices
            .iter()
            .map(|&i| self.x[i][feature])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
            return None;
        }

        let threshold = if (hi - lo).is_finite() {
            self.rng.gen_range(lo..hi)
        } else {
            // Width overflows f64; interpolate instead of sampling the range
            let t: f64 = self.rng.gen();
            lo * (1.0 - t) + hi * t
        };
        let mut left = vec![0usize; self.n_classes];
        let mut right = vec![0usize; self.n_classes];
        for &i in indices {
            if self.x[i][feature] <= threshold {
                left[self.y[i]] += 1;
            } else {
                right[self.y[i]] += 1;
            }
        }

        let n_left: usize = left.iter().sum();
        let n_right: usize = right.iter().sum();
        if n_left < min_leaf || n_right < min_leaf {
            return None;
        }

        Some(Candidate {
            feature,
            threshold,
            weighted_impurity: n_left as f64 * gini(&left, n_left)
                + n_right as f64 * gini(&right, n_right),
        })
    }
}

/// Point halfway between `a < b` that stays finite for finite inputs.
fn midpoint(a: f64, b: f64) -> f64 {
    let width = b - a;
    if width.is_finite() {
        a + width / 2.0
    } else {
        a / 2.0 + b / 2.0
    }
}

/// Gini impurity of a class count vector.
fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}
