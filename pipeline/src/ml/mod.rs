//! Regression models used by the trainer
//!
//! Two candidate families are supported, both tree ensembles built on the
//! same CART learner. [`Algorithm`] is the untrained description taken from
//! configuration; [`FittedModel`] is what ends up inside a model artifact.

pub mod gradient_boosting;
pub mod random_forest;
pub mod tree;

pub use gradient_boosting::{GradientBoostingParams, GradientBoostingRegressor};
pub use random_forest::{RandomForestParams, RandomForestRegressor};
pub use tree::{RegressionTree, TreeNode, TreeParams};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// A candidate algorithm with its hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", content = "params", rename_all = "snake_case")]
pub enum Algorithm {
    RandomForest(RandomForestParams),
    GradientBoosting(GradientBoostingParams),
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::RandomForest(_) => "Random Forest",
            Algorithm::GradientBoosting(_) => "Gradient Boosting",
        }
    }

    pub fn fit(&self, samples: &[Vec<f64>], targets: &[f64], seed: u64) -> PipelineResult<FittedModel> {
        match self {
            Algorithm::RandomForest(params) => {
                RandomForestRegressor::fit(params, samples, targets, seed).map(FittedModel::RandomForest)
            }
            Algorithm::GradientBoosting(params) => {
                GradientBoostingRegressor::fit(params, samples, targets, seed)
                    .map(FittedModel::GradientBoosting)
            }
        }
    }
}

/// A trained regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum FittedModel {
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
}

impl FittedModel {
    pub fn name(&self) -> &'static str {
        match self {
            FittedModel::RandomForest(_) => "Random Forest",
            FittedModel::GradientBoosting(_) => "Gradient Boosting",
        }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        match self {
            FittedModel::RandomForest(m) => m.predict(features),
            FittedModel::GradientBoosting(m) => m.predict(features),
        }
    }

    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Vec<f64> {
        match self {
            FittedModel::RandomForest(m) => m.predict_batch(samples),
            FittedModel::GradientBoosting(m) => m.predict_batch(samples),
        }
    }

    pub fn feature_importances(&self) -> Vec<f64> {
        match self {
            FittedModel::RandomForest(m) => m.feature_importances(),
            FittedModel::GradientBoosting(m) => m.feature_importances(),
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            FittedModel::RandomForest(m) => m.n_features(),
            FittedModel::GradientBoosting(m) => m.n_features(),
        }
    }
}

/// Reject matrices the tree learner cannot work with.
pub(crate) fn check_training_matrix(samples: &[Vec<f64>], targets: &[f64]) -> PipelineResult<()> {
    let Some(first) = samples.first() else {
        return Err(PipelineError::Training("no training rows".to_string()));
    };
    if samples.len() != targets.len() {
        return Err(PipelineError::Training(format!(
            "{} feature rows but {} targets",
            samples.len(),
            targets.len()
        )));
    }
    let width = first.len();
    if let Some(row) = samples.iter().position(|r| r.len() != width) {
        return Err(PipelineError::Training(format!(
            "row {row} has {} features, expected {width}",
            samples[row].len()
        )));
    }
    if samples.iter().flatten().chain(targets).any(|v| !v.is_finite()) {
        return Err(PipelineError::Training(
            "non-finite value in training data".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_names() {
        assert_eq!(Algorithm::RandomForest(Default::default()).name(), "Random Forest");
        assert_eq!(
            Algorithm::GradientBoosting(Default::default()).name(),
            "Gradient Boosting"
        );
    }

    #[test]
    fn fitted_model_keeps_algorithm_name() {
        let samples: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let algorithm = Algorithm::GradientBoosting(GradientBoostingParams {
            n_estimators: 5,
            ..Default::default()
        });
        let model = algorithm.fit(&samples, &targets, 42).unwrap();
        assert_eq!(model.name(), algorithm.name());
        assert_eq!(model.n_features(), 1);
    }

    #[test]
    fn fitted_model_survives_json() {
        let samples: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64, 1.0]).collect();
        let targets: Vec<f64> = (0..12).map(|i| (i * 2) as f64).collect();
        let model = Algorithm::RandomForest(RandomForestParams {
            n_estimators: 3,
            ..Default::default()
        })
        .fit(&samples, &targets, 42)
        .unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let back: FittedModel = serde_json::from_str(&json).unwrap();
        assert!((back.predict(&[4.0, 1.0]) - model.predict(&[4.0, 1.0])).abs() < 1e-9);
    }

    #[test]
    fn ragged_matrix_is_rejected() {
        let samples = vec![vec![1.0, 2.0], vec![1.0]];
        let err = check_training_matrix(&samples, &[1.0, 2.0]).unwrap_err();
        assert_eq!(err.code(), "TRAINING_ERROR");
    }

    #[test]
    fn nan_target_is_rejected() {
        let samples = vec![vec![1.0], vec![2.0]];
        assert!(check_training_matrix(&samples, &[1.0, f64::NAN]).is_err());
    }

    #[test]
    fn empty_matrix_is_rejected() {
        assert!(check_training_matrix(&[], &[]).is_err());
    }
}
