//! Gradient boosted regression trees with squared-error loss.
//!
//! Starts from the target mean; each stage fits a tree to the current
//! residuals and adds it scaled by the learning rate.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::check_training_matrix;
use super::random_forest::average_importances;
use super::tree::{RegressionTree, TreeParams};
use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Row fraction drawn (without replacement) for each stage
    pub subsample: f64,
}

impl Default for GradientBoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.05,
            max_depth: 8,
            min_samples_split: 5,
            min_samples_leaf: 1,
            subsample: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    initial_prediction: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl GradientBoostingRegressor {
    pub fn fit(
        params: &GradientBoostingParams,
        samples: &[Vec<f64>],
        targets: &[f64],
        seed: u64,
    ) -> PipelineResult<Self> {
        check_training_matrix(samples, targets)?;
        if !(params.learning_rate > 0.0 && params.learning_rate <= 1.0) {
            return Err(PipelineError::Training(format!(
                "learning rate must be in (0, 1], got {}",
                params.learning_rate
            )));
        }
        if !(params.subsample > 0.0 && params.subsample <= 1.0) {
            return Err(PipelineError::Training(format!(
                "subsample must be in (0, 1], got {}",
                params.subsample
            )));
        }

        let n = samples.len();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: None,
        };
        let initial_prediction = targets.iter().sum::<f64>() / n as f64;
        let mut current = vec![initial_prediction; n];
        let mut rng = StdRng::seed_from_u64(seed);
        let all_rows: Vec<usize> = (0..n).collect();
        let stage_rows = ((n as f64 * params.subsample).round() as usize).clamp(1, n);

        let mut trees = Vec::with_capacity(params.n_estimators);
        for _ in 0..params.n_estimators {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&current)
                .map(|(y, p)| y - p)
                .collect();

            let indices = if stage_rows < n {
                let mut rows = sample(&mut rng, n, stage_rows).into_vec();
                rows.sort_unstable();
                rows
            } else {
                all_rows.clone()
            };

            let tree = RegressionTree::fit(samples, &residuals, &indices, &tree_params, &mut rng);
            for (prediction, row) in current.iter_mut().zip(samples) {
                *prediction += params.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        Ok(Self {
            initial_prediction,
            learning_rate: params.learning_rate,
            trees,
            n_features: samples.first().map_or(0, Vec::len),
        })
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        let boost: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        self.initial_prediction + self.learning_rate * boost
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

    pub fn feature_importances(&self) -> Vec<f64> {
        average_importances(&self.trees, self.n_features)
    }
}
