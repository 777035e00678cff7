//! Evaluator: scores candidates on the test partition and picks one
//!
//! Scores are computed twice: on capacity, and on observed yield after
//! multiplying each predicted capacity by its row's fraction. Selection is
//! lowest capacity MAE, then lowest capacity RMSE, then candidate order.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::HarvestFractionTable;
use uuid::Uuid;

use super::training::{training_matrix, TrainedCandidate};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{
    EngineeredRecord, ErrorAnalysis, FeatureImportance, FeatureSet, RegressionMetrics,
    TrainedModel, VarietyEncoder, TARGET_NAME,
};

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    sum / actual.len() as f64
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    (sum / actual.len() as f64).sqrt()
}

/// Coefficient of determination. A constant actual series scores 1.0 when
/// matched exactly and 0.0 otherwise.
pub fn r2(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Mean absolute percentage error in percent, over rows whose actual value
/// is positive; 0.0 when there is no such row.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    let errors: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| **a > 0.0)
        .map(|(a, p)| ((a - p) / a).abs())
        .collect();
    if errors.is_empty() {
        return 0.0;
    }
    errors.iter().sum::<f64>() / errors.len() as f64 * 100.0
}

pub fn regression_metrics(actual: &[f64], predicted: &[f64]) -> RegressionMetrics {
    RegressionMetrics {
        mae: mae(actual, predicted),
        rmse: rmse(actual, predicted),
        r2: r2(actual, predicted),
        mape: mape(actual, predicted),
        samples: actual.len(),
    }
}

/// Linear-interpolated percentile of an ascending slice, `q` in [0, 1].
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
        }
    }
}

pub fn error_analysis(actual: &[f64], predicted: &[f64]) -> ErrorAnalysis {
    let mut errors: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .collect();
    errors.sort_by(f64::total_cmp);
    ErrorAnalysis {
        mean: mae(actual, predicted),
        median: percentile(&errors, 0.5),
        max: errors.last().copied().unwrap_or(0.0),
        p90: percentile(&errors, 0.9),
    }
}

/// Test-partition scores of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub algorithm: String,
    pub capacity_metrics: RegressionMetrics,
    pub observed_metrics: RegressionMetrics,
    pub capacity_errors: ErrorAnalysis,
    pub cv_mae: Option<f64>,
}

/// Everything the artifact carries besides the model itself
#[derive(Debug, Clone)]
pub struct ArtifactContext {
    pub variety_encoder: VarietyEncoder,
    pub fraction_table: HarvestFractionTable,
    pub training_cutoff: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    /// One report per candidate, in candidate order
    pub reports: Vec<CandidateReport>,
    pub selected_index: usize,
    pub selected: TrainedModel,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, candidate: &TrainedCandidate, test: &[EngineeredRecord]) -> CandidateReport {
        let (samples, capacity_actual) = training_matrix(test);
        let capacity_predicted = candidate.model.predict_batch(&samples);

        let observed_actual: Vec<f64> = test.iter().map(|r| r.kg_observed).collect();
        let observed_predicted: Vec<f64> = test
            .iter()
            .zip(&capacity_predicted)
            .map(|(r, p)| p * r.fraction)
            .collect();

        CandidateReport {
            algorithm: candidate.algorithm.name().to_string(),
            capacity_metrics: regression_metrics(&capacity_actual, &capacity_predicted),
            observed_metrics: regression_metrics(&observed_actual, &observed_predicted),
            capacity_errors: error_analysis(&capacity_actual, &capacity_predicted),
            cv_mae: candidate.cv_mae,
        }
    }

    /// Index of the best report: lowest MAE, then lowest RMSE, then first.
    pub fn select(&self, reports: &[CandidateReport]) -> Option<usize> {
        reports
            .iter()
            .enumerate()
            .min_by(|(ia, a), (ib, b)| {
                a.capacity_metrics
                    .mae
                    .total_cmp(&b.capacity_metrics.mae)
                    .then(a.capacity_metrics.rmse.total_cmp(&b.capacity_metrics.rmse))
                    .then(ia.cmp(ib))
            })
            .map(|(idx, _)| idx)
    }

    /// Score every candidate and package the winner as a model artifact.
    pub fn evaluate(
        &self,
        candidates: Vec<TrainedCandidate>,
        test: &[EngineeredRecord],
        context: ArtifactContext,
    ) -> PipelineResult<Evaluation> {
        if test.is_empty() {
            return Err(PipelineError::Training("test partition is empty".to_string()));
        }

        let reports: Vec<CandidateReport> = candidates.iter().map(|c| self.score(c, test)).collect();
        for report in &reports {
            tracing::info!(
                "{}: capacity MAE {:.2}, RMSE {:.2}, R2 {:.3}, MAPE {:.1}% | observed MAE {:.2}, R2 {:.3}",
                report.algorithm,
                report.capacity_metrics.mae,
                report.capacity_metrics.rmse,
                report.capacity_metrics.r2,
                report.capacity_metrics.mape,
                report.observed_metrics.mae,
                report.observed_metrics.r2
            );
        }

        let selected_index = self
            .select(&reports)
            .ok_or_else(|| PipelineError::Training("no candidate to select".to_string()))?;
        let report = &reports[selected_index];
        let winner = candidates
            .into_iter()
            .nth(selected_index)
            .ok_or_else(|| PipelineError::Training("selected candidate vanished".to_string()))?;
        tracing::info!("Selected {}", report.algorithm);

        let feature_names = FeatureSet::names();
        let mut feature_importances: Vec<FeatureImportance> = feature_names
            .iter()
            .zip(winner.model.feature_importances())
            .map(|(feature, importance)| FeatureImportance {
                feature: feature.clone(),
                importance,
            })
            .collect();
        feature_importances.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        let selected = TrainedModel {
            model_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            algorithm: winner.algorithm.name().to_string(),
            model: winner.model,
            feature_names,
            variety_encoder: context.variety_encoder,
            fraction_table: context.fraction_table,
            capacity_metrics: report.capacity_metrics,
            observed_metrics: report.observed_metrics,
            target: TARGET_NAME.to_string(),
            feature_importances,
            training_cutoff: context.training_cutoff,
        };

        Ok(Evaluation {
            reports,
            selected_index,
            selected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, mae: f64, rmse: f64) -> CandidateReport {
        CandidateReport {
            algorithm: name.to_string(),
            capacity_metrics: RegressionMetrics {
                mae,
                rmse,
                ..RegressionMetrics::default()
            },
            observed_metrics: RegressionMetrics::default(),
            capacity_errors: ErrorAnalysis::default(),
            cv_mae: None,
        }
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    #[test]
    fn metrics_on_known_values() {
        let actual = [10.0, 20.0, 30.0, 40.0];
        let predicted = [12.0, 18.0, 33.0, 37.0];
        let m = regression_metrics(&actual, &predicted);
        assert!((m.mae - 2.5).abs() < 1e-9);
        assert!((m.rmse - (26.0f64 / 4.0).sqrt()).abs() < 1e-9);
        assert!((m.r2 - (1.0 - 26.0 / 500.0)).abs() < 1e-9);
        let expected_mape = (0.2 + 0.1 + 0.1 + 0.075) / 4.0 * 100.0;
        assert!((m.mape - expected_mape).abs() < 1e-9);
        assert_eq!(m.samples, 4);
    }

    #[test]
    fn mape_skips_zero_actuals() {
        assert!((mape(&[0.0, 50.0], &[5.0, 40.0]) - 20.0).abs() < 1e-9);
        assert_eq!(mape(&[0.0], &[1.0]), 0.0);
    }

    #[test]
    fn r2_on_constant_actuals() {
        assert_eq!(r2(&[5.0, 5.0], &[5.0, 5.0]), 1.0);
        assert_eq!(r2(&[5.0, 5.0], &[4.0, 6.0]), 0.0);
    }

    #[test]
    fn percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.5), 3.0);
        assert!((percentile(&sorted, 0.9) - 4.6).abs() < 1e-9);
        assert_eq!(percentile(&[], 0.9), 0.0);
    }

    #[test]
    fn error_analysis_summarises_absolute_errors() {
        let analysis = error_analysis(&[10.0, 10.0, 10.0, 10.0], &[9.0, 12.0, 14.0, 10.0]);
        assert!((analysis.mean - 1.75).abs() < 1e-9);
        assert!((analysis.median - 1.5).abs() < 1e-9);
        assert_eq!(analysis.max, 4.0);
    }

    // ========================================================================
    // Selection
    // ========================================================================

    #[test]
    fn lowest_mae_wins() {
        let reports = vec![report("a", 5.0, 1.0), report("b", 4.0, 9.0)];
        assert_eq!(Evaluator::new().select(&reports), Some(1));
    }

    #[test]
    fn mae_tie_broken_by_rmse() {
        let reports = vec![report("a", 4.0, 7.0), report("b", 4.0, 6.0)];
        assert_eq!(Evaluator::new().select(&reports), Some(1));
    }

    #[test]
    fn full_tie_keeps_first() {
        let reports = vec![report("a", 4.0, 6.0), report("b", 4.0, 6.0)];
        assert_eq!(Evaluator::new().select(&reports), Some(0));
    }

    #[test]
    fn nothing_to_select() {
        assert_eq!(Evaluator::new().select(&[]), None);
    }
}
