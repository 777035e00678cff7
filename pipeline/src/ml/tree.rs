//! CART regression tree.
//!
//! Array-based node storage: the root sits at index 0 and every split node
//! stores the indices of its two children. Splits minimise the summed
//! squared error of the children (variance reduction); samples with
//! `feature <= threshold` go left.
//!
//! The same tree backs both ensembles: random forests grow deep trees on
//! bootstrap samples, gradient boosting grows shallow trees on residuals.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split; `None` examines all of them
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

/// A node in a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        value: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Squared-error reduction achieved by this split
        gain: f64,
        samples: usize,
    },
}

impl TreeNode {
    pub const fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }
}

/// A fitted regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    samples: &'a [Vec<f64>],
    targets: &'a [f64],
    params: &'a TreeParams,
    rng: &'a mut StdRng,
    n_features: usize,
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `indices` (repeats allowed, as
    /// produced by bootstrap sampling).
    pub fn fit(
        samples: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = samples.first().map_or(0, Vec::len);
        let mut builder = TreeBuilder {
            samples,
            targets,
            params,
            rng,
            n_features,
            nodes: Vec::new(),
        };
        builder.grow(indices.to_vec(), 0);
        Self {
            nodes: builder.nodes,
            n_features,
        }
    }

    /// Predict a single sample.
    ///
    /// Missing trailing features read as `0.0`.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value, .. }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                }) => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Tree depth (longest root-to-leaf path).
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        self.node_depth(0)
    }

    fn node_depth(&self, idx: usize) -> usize {
        match self.nodes.get(idx) {
            Some(TreeNode::Split { left, right, .. }) => {
                1 + self.node_depth(*left).max(self.node_depth(*right))
            }
            _ => 0,
        }
    }

    /// Split gains summed per feature, normalised to sum to one (all zeros
    /// for a single-leaf tree).
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut importances = vec![0.0; self.n_features];
        for node in &self.nodes {
            if let TreeNode::Split { feature, gain, .. } = node {
                if let Some(slot) = importances.get_mut(*feature) {
                    *slot += gain;
                }
            }
        }
        normalize(&mut importances);
        importances
    }
}

/// Scale values in place so they sum to one; leaves all-zero input untouched.
pub(crate) fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
}

impl<'a> TreeBuilder<'a> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let n = indices.len();
        let (sum, sum_sq) = indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
            let y = self.targets[i];
            (s + y, sq + y * y)
        });
        let value = if n == 0 { 0.0 } else { sum / n as f64 };

        let node_index = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { value, samples: n });

        let min_leaf = self.params.min_samples_leaf.max(1);
        if depth >= self.params.max_depth
            || n < self.params.min_samples_split.max(2)
            || n < 2 * min_leaf
        {
            return node_index;
        }

        let parent_sse = sum_sq - sum * sum / n as f64;
        if parent_sse <= f64::EPSILON * sum_sq.max(1.0) {
            return node_index;
        }

        let Some(best) = self.best_split(&indices, sum, sum_sq, parent_sse) else {
            return node_index;
        };

        let samples = self.samples;
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| samples[i][best.feature] <= best.threshold);
        drop(indices);

        let left_index = self.grow(left, depth + 1);
        let right_index = self.grow(right, depth + 1);
        self.nodes[node_index] = TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: left_index,
            right: right_index,
            gain: best.gain,
            samples: n,
        };
        node_index
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        match self.params.max_features {
            Some(k) if k > 0 && k < self.n_features => {
                let mut features = sample(&mut *self.rng, self.n_features, k).into_vec();
                features.sort_unstable();
                features
            }
            _ => (0..self.n_features).collect(),
        }
    }

    fn best_split(
        &mut self,
        indices: &[usize],
        total_sum: f64,
        total_sq: f64,
        parent_sse: f64,
    ) -> Option<SplitCandidate> {
        let features = self.candidate_features();
        let samples = self.samples;
        let targets = self.targets;
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut best: Option<SplitCandidate> = None;
        let mut order = indices.to_vec();

        for feature in features {
            order.sort_by(|&a, &b| samples[a][feature].total_cmp(&samples[b][feature]));

            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for k in 0..n - 1 {
                let y = targets[order[k]];
                left_sum += y;
                left_sq += y * y;

                let left_n = k + 1;
                let right_n = n - left_n;
                if left_n < min_leaf {
                    continue;
                }
                if right_n < min_leaf {
                    break;
                }

                let current = samples[order[k]][feature];
                let next = samples[order[k + 1]][feature];
                if next <= current {
                    continue;
                }

                let left_sse = left_sq - left_sum * left_sum / left_n as f64;
                let right_sum = total_sum - left_sum;
                let right_sse = (total_sq - left_sq) - right_sum * right_sum / right_n as f64;
                let gain = parent_sse - left_sse - right_sse;

                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    let mut threshold = current + (next - current) / 2.0;
                    if threshold >= next {
                        threshold = current;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}
