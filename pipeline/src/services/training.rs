//! ModelTrainer: fits every candidate on the same training matrix

use rayon::prelude::*;

use crate::error::{PipelineError, PipelineResult};
use crate::ml::{Algorithm, FittedModel};
use crate::models::{EngineeredRecord, FeatureSet};

use super::evaluation::mae;

/// A fitted candidate, not yet scored on the test partition
#[derive(Debug, Clone)]
pub struct TrainedCandidate {
    pub algorithm: Algorithm,
    pub model: FittedModel,
    /// Forward-chaining cross-validation MAE on the training partition
    pub cv_mae: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ModelTrainer {
    candidates: Vec<Algorithm>,
    seed: u64,
    cv_folds: usize,
}

/// Feature matrix and target column of a set of records
pub fn training_matrix(records: &[EngineeredRecord]) -> (Vec<Vec<f64>>, Vec<f64>) {
    records
        .iter()
        .map(|r| (r.features.to_vec(), r.kg_biological))
        .unzip()
}

impl ModelTrainer {
    pub fn new(candidates: Vec<Algorithm>, seed: u64, cv_folds: usize) -> Self {
        Self {
            candidates,
            seed,
            cv_folds,
        }
    }

    pub fn candidates(&self) -> &[Algorithm] {
        &self.candidates
    }

    /// Fit all candidates in parallel. Output keeps candidate order.
    pub fn train(&self, train: &[EngineeredRecord]) -> PipelineResult<Vec<TrainedCandidate>> {
        if train.is_empty() {
            return Err(PipelineError::Training(
                "training partition is empty".to_string(),
            ));
        }
        if train.len() < FeatureSet::DIM {
            return Err(PipelineError::Training(format!(
                "{} training rows for {} features",
                train.len(),
                FeatureSet::DIM
            )));
        }
        if self.candidates.is_empty() {
            return Err(PipelineError::Training("no candidate algorithms".to_string()));
        }

        let (samples, targets) = training_matrix(train);

        self.candidates
            .par_iter()
            .map(|algorithm| -> PipelineResult<TrainedCandidate> {
                tracing::info!("Training {} on {} rows", algorithm.name(), samples.len());
                let model = algorithm.fit(&samples, &targets, self.seed)?;
                let cv_mae = self.cross_validate(algorithm, &samples, &targets)?;
                if let Some(score) = cv_mae {
                    tracing::info!("{} cross-validation MAE: {:.2}", algorithm.name(), score);
                }
                Ok(TrainedCandidate {
                    algorithm: algorithm.clone(),
                    model,
                    cv_mae,
                })
            })
            .collect()
    }

    /// Mean validation MAE over expanding-window folds.
    ///
    /// Rows are split into `cv_folds + 1` consecutive blocks; fold k trains
    /// on blocks `0..=k` and validates on block `k + 1`. `None` when disabled
    /// or when there are too few rows for every block to hold one.
    fn cross_validate(
        &self,
        algorithm: &Algorithm,
        samples: &[Vec<f64>],
        targets: &[f64],
    ) -> PipelineResult<Option<f64>> {
        let blocks = self.cv_folds + 1;
        if self.cv_folds == 0 || samples.len() < blocks * 2 {
            return Ok(None);
        }
        let block = samples.len() / blocks;

        let mut scores = Vec::with_capacity(self.cv_folds);
        for fold in 1..=self.cv_folds {
            let train_end = block * fold;
            let valid_end = if fold == self.cv_folds {
                samples.len()
            } else {
                train_end + block
            };
            let model = algorithm.fit(&samples[..train_end], &targets[..train_end], self.seed)?;
            let predicted = model.predict_batch(&samples[train_end..valid_end]);
            scores.push(mae(&targets[train_end..valid_end], &predicted));
        }

        Ok(Some(scores.iter().sum::<f64>() / scores.len() as f64))
    }
}
