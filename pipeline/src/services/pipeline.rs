//! Training run: merge, transform, engineer, split, train, evaluate

use std::time::Instant;

use serde::Serialize;

use super::capacity::CapacityTransformer;
use super::evaluation::{ArtifactContext, CandidateReport, Evaluator};
use super::features::FeatureEngineer;
use super::merge::Merger;
use super::split::Splitter;
use super::summary::{summarize, DatasetSummary};
use super::training::ModelTrainer;
use crate::config::Config;
use crate::error::PipelineResult;
use crate::models::{HarvestObservation, MergeReport, MergedRecord, TrainedModel, VarietyEncoder, WeatherObservation};

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub candidates: Vec<CandidateReport>,
    pub merge_report: MergeReport,
    pub summary: DatasetSummary,
    /// Merged rows, kept so the caller can serve them as prediction history
    pub merged: Vec<MergedRecord>,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Compact view of an outcome for logs and reports
#[derive(Debug, Serialize)]
pub struct TrainingReport<'a> {
    pub selected: &'a str,
    pub candidates: &'a [CandidateReport],
    pub merge: &'a MergeReport,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl TrainingOutcome {
    pub fn report(&self) -> TrainingReport<'_> {
        TrainingReport {
            selected: &self.model.algorithm,
            candidates: &self.candidates,
            merge: &self.merge_report,
            train_rows: self.train_rows,
            test_rows: self.test_rows,
        }
    }
}

/// Runs the stages strictly in sequence; each consumes the previous
/// stage's complete output.
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: Config,
}

impl TrainingPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        harvests: &[HarvestObservation],
        weather: &[WeatherObservation],
    ) -> PipelineResult<TrainingOutcome> {
        self.config.validate()?;
        let started = Instant::now();
        tracing::info!(
            "Starting training run on {} harvest and {} weather rows",
            harvests.len(),
            weather.len()
        );

        let (merged, merge_report) = Merger::new().merge(harvests, weather);

        let fraction_table = self.config.harvest.fractions;
        let capacity = CapacityTransformer::new(fraction_table).transform(merged.clone())?;
        let summary = summarize(&capacity);

        let encoder = VarietyEncoder::fit(merged.iter().map(|r| r.variety_id));
        let engineered = FeatureEngineer::new(encoder.clone()).engineer(&capacity, weather)?;

        let split = Splitter::new(self.config.pipeline.train_ratio).split(engineered)?;

        let trainer = ModelTrainer::new(
            self.config.candidates(),
            self.config.pipeline.seed,
            self.config.pipeline.cv_folds,
        );
        let candidates = trainer.train(&split.train)?;

        let evaluation = Evaluator::new().evaluate(
            candidates,
            &split.test,
            ArtifactContext {
                variety_encoder: encoder,
                fraction_table,
                training_cutoff: split.cutoff,
            },
        )?;

        tracing::info!(
            "Training run finished in {:.1}s, selected {}",
            started.elapsed().as_secs_f64(),
            evaluation.selected.algorithm
        );

        Ok(TrainingOutcome {
            model: evaluation.selected,
            candidates: evaluation.reports,
            merge_report,
            summary,
            merged,
            train_rows: split.train.len(),
            test_rows: split.test.len(),
        })
    }
}
