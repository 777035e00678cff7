//! Random forest regression: bagged CART trees, prediction is the mean.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::check_training_matrix;
use super::tree::{normalize, RegressionTree, TreeParams};
use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub bootstrap: bool,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            bootstrap: true,
        }
    }
}

impl RandomForestParams {
    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Fit the forest. Per-tree seeds are drawn up front from `seed`, so the
    /// result does not depend on how rayon schedules the trees.
    pub fn fit(
        params: &RandomForestParams,
        samples: &[Vec<f64>],
        targets: &[f64],
        seed: u64,
    ) -> PipelineResult<Self> {
        check_training_matrix(samples, targets)?;
        if params.n_estimators == 0 {
            return Err(PipelineError::Training(
                "random forest needs at least one tree".to_string(),
            ));
        }

        let n = samples.len();
        let mut seeder = StdRng::seed_from_u64(seed);
        let tree_seeds: Vec<u64> = (0..params.n_estimators).map(|_| seeder.gen()).collect();
        let tree_params = params.tree_params();

        let trees: Vec<RegressionTree> = tree_seeds
            .par_iter()
            .map(|&tree_seed| {
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let indices: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(samples, targets, &indices, &tree_params, &mut rng)
            })
            .collect();

        Ok(Self {
            trees,
            n_features: samples.first().map_or(0, Vec::len),
        })
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        total / self.trees.len() as f64
    }

    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Vec<f64> {
        samples.iter().map(|s| self.predict(s)).collect()
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean of the per-tree normalised importances.
    pub fn feature_importances(&self) -> Vec<f64> {
        average_importances(&self.trees, self.n_features)
    }
}

pub(crate) fn average_importances(trees: &[RegressionTree], n_features: usize) -> Vec<f64> {
    let mut totals = vec![0.0; n_features];
    for tree in trees {
        for (slot, value) in totals.iter_mut().zip(tree.feature_importances()) {
            *slot += value;
        }
    }
    normalize(&mut totals);
    totals
}
