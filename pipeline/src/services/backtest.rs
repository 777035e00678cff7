//! Backtest of stored predictions against the harvests that followed
//!
//! Non-picking days are skipped. Observed-yield errors use the recorded
//! harvest; capacity errors invert it with the prediction's own fraction.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::evaluation::{mae, percentile, rmse};
use crate::models::{HarvestObservation, PredictionResult, VarietyId};

/// Mean bias beyond which the model is called miscalibrated, in kg
pub const BIAS_THRESHOLD_KG: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Calibration {
    Overestimates,
    Underestimates,
    WellCalibrated,
}

/// One prediction matched with its actual harvest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRow {
    pub date: NaiveDate,
    pub variety_id: VarietyId,
    pub fraction: f64,
    pub predicted_kg_observed: f64,
    pub actual_kg_observed: f64,
    pub predicted_kg_biological: f64,
    pub actual_kg_biological: f64,
    /// Predicted minus actual, observed yield
    pub error_kg: f64,
    /// Absolute error over actual, percent; 0 when nothing was picked
    pub error_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub count: usize,
    pub mae: f64,
    pub rmse: f64,
    pub mape: f64,
    pub mean_predicted: f64,
    pub mean_actual: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasAnalysis {
    pub overestimated: usize,
    pub underestimated: usize,
    pub mean_bias_kg: f64,
    pub calibration: Calibration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub rows: Vec<BacktestRow>,
    /// Predictions with no matching harvest
    pub unmatched: usize,
    pub observed: ErrorSummary,
    pub max_error_kg: f64,
    pub min_error_kg: f64,
    pub median_error_kg: f64,
    pub capacity_mae: f64,
    pub capacity_rmse: f64,
    pub by_variety: BTreeMap<VarietyId, ErrorSummary>,
    /// Keyed by weekday, Monday = 0
    pub by_weekday: BTreeMap<u32, ErrorSummary>,
    pub bias: BiasAnalysis,
}

fn summarize(rows: &[&BacktestRow]) -> ErrorSummary {
    let predicted: Vec<f64> = rows.iter().map(|r| r.predicted_kg_observed).collect();
    let actual: Vec<f64> = rows.iter().map(|r| r.actual_kg_observed).collect();
    let n = rows.len().max(1) as f64;
    ErrorSummary {
        count: rows.len(),
        mae: mae(&actual, &predicted),
        rmse: rmse(&actual, &predicted),
        mape: rows.iter().map(|r| r.error_pct).sum::<f64>() / n,
        mean_predicted: predicted.iter().sum::<f64>() / n,
        mean_actual: actual.iter().sum::<f64>() / n,
    }
}

/// Match predictions with harvests by (date, variety) and score them.
///
/// `None` when no prediction could be matched.
pub fn backtest(
    predictions: &[PredictionResult],
    actuals: &[HarvestObservation],
) -> Option<BacktestReport> {
    let harvested: HashMap<(NaiveDate, VarietyId), f64> = actuals
        .iter()
        .map(|h| ((h.date, h.variety_id), h.kg_observed))
        .collect();

    let mut rows = Vec::new();
    let mut unmatched = 0;
    for prediction in predictions.iter().filter(|p| p.fraction_used > 0.0) {
        let Some(&actual) = harvested.get(&(prediction.date, prediction.variety_id)) else {
            tracing::debug!(
                "No harvest for {} on {}",
                prediction.variety_id,
                prediction.date
            );
            unmatched += 1;
            continue;
        };
        let error_kg = prediction.predicted_kg_observed - actual;
        rows.push(BacktestRow {
            date: prediction.date,
            variety_id: prediction.variety_id,
            fraction: prediction.fraction_used,
            predicted_kg_observed: prediction.predicted_kg_observed,
            actual_kg_observed: actual,
            predicted_kg_biological: prediction.predicted_kg_biological,
            actual_kg_biological: actual / prediction.fraction_used,
            error_kg,
            error_pct: if actual > 0.0 {
                error_kg.abs() / actual * 100.0
            } else {
                0.0
            },
        });
    }

    if rows.is_empty() {
        tracing::warn!("Backtest found no prediction with a matching harvest");
        return None;
    }

    let all: Vec<&BacktestRow> = rows.iter().collect();
    let observed = summarize(&all);

    let mut abs_errors: Vec<f64> = rows.iter().map(|r| r.error_kg.abs()).collect();
    abs_errors.sort_by(f64::total_cmp);

    let capacity_predicted: Vec<f64> = rows.iter().map(|r| r.predicted_kg_biological).collect();
    let capacity_actual: Vec<f64> = rows.iter().map(|r| r.actual_kg_biological).collect();

    let mut variety_groups: BTreeMap<VarietyId, Vec<&BacktestRow>> = BTreeMap::new();
    let mut weekday_groups: BTreeMap<u32, Vec<&BacktestRow>> = BTreeMap::new();
    for row in &rows {
        variety_groups.entry(row.variety_id).or_default().push(row);
        weekday_groups
            .entry(row.date.weekday().num_days_from_monday())
            .or_default()
            .push(row);
    }

    let mean_bias_kg = rows.iter().map(|r| r.error_kg).sum::<f64>() / rows.len() as f64;
    let calibration = if mean_bias_kg > BIAS_THRESHOLD_KG {
        Calibration::Overestimates
    } else if mean_bias_kg < -BIAS_THRESHOLD_KG {
        Calibration::Underestimates
    } else {
        Calibration::WellCalibrated
    };
    let bias = BiasAnalysis {
        overestimated: rows.iter().filter(|r| r.error_kg > 0.0).count(),
        underestimated: rows.iter().filter(|r| r.error_kg < 0.0).count(),
        mean_bias_kg,
        calibration,
    };

    let report = BacktestReport {
        unmatched,
        observed,
        max_error_kg: abs_errors.last().copied().unwrap_or(0.0),
        min_error_kg: abs_errors.first().copied().unwrap_or(0.0),
        median_error_kg: percentile(&abs_errors, 0.5),
        capacity_mae: mae(&capacity_actual, &capacity_predicted),
        capacity_rmse: rmse(&capacity_actual, &capacity_predicted),
        by_variety: variety_groups
            .into_iter()
            .map(|(k, group)| (k, summarize(&group)))
            .collect(),
        by_weekday: weekday_groups
            .into_iter()
            .map(|(k, group)| (k, summarize(&group)))
            .collect(),
        bias,
        rows,
    };
    tracing::info!(
        "Backtest on {} predictions: MAE {:.2} kg, mean bias {:.2} kg ({:?})",
        report.observed.count,
        report.observed.mae,
        report.bias.mean_bias_kg,
        report.bias.calibration
    );
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    fn prediction(day: u32, observed: f64, fraction: f64) -> PredictionResult {
        PredictionResult {
            date: date(day),
            variety_id: VarietyId(1),
            plants_count: 1000,
            predicted_kg_biological: if fraction > 0.0 { observed / fraction } else { 0.0 },
            predicted_kg_observed: observed,
            fraction_used: fraction,
        }
    }

    fn harvest(day: u32, kg: f64) -> HarvestObservation {
        HarvestObservation {
            date: date(day),
            variety_id: VarietyId(1),
            day_number: day as i32,
            plants_count: 1000,
            kg_observed: kg,
            year: 2024,
        }
    }

    #[test]
    fn scores_matched_days_and_skips_sundays() {
        // 4 Apr is a Thursday, 7 Apr a Sunday
        let predictions = vec![
            prediction(4, 110.0, 0.5),
            prediction(5, 90.0, 0.5),
            prediction(7, 0.0, 0.0),
            prediction(8, 50.0, 1.0 / 3.0),
        ];
        let actuals = vec![harvest(4, 100.0), harvest(5, 100.0), harvest(7, 0.0)];

        let report = backtest(&predictions, &actuals).unwrap();

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.unmatched, 1);
        assert!((report.observed.mae - 10.0).abs() < 1e-9);
        assert!((report.observed.mape - 10.0).abs() < 1e-9);
        assert!((report.capacity_mae - 20.0).abs() < 1e-9);
        assert_eq!(report.bias.overestimated, 1);
        assert_eq!(report.bias.underestimated, 1);
        assert_eq!(report.bias.calibration, Calibration::WellCalibrated);
        assert_eq!(report.by_weekday.len(), 2);
        assert_eq!(report.by_variety[&VarietyId(1)].count, 2);
    }

    #[test]
    fn large_positive_bias_is_flagged() {
        let predictions = vec![prediction(4, 130.0, 0.5), prediction(5, 120.0, 0.5)];
        let actuals = vec![harvest(4, 100.0), harvest(5, 100.0)];
        let report = backtest(&predictions, &actuals).unwrap();
        assert_eq!(report.bias.calibration, Calibration::Overestimates);
        assert!((report.bias.mean_bias_kg - 25.0).abs() < 1e-9);
        assert_eq!(report.max_error_kg, 30.0);
        assert_eq!(report.min_error_kg, 20.0);
        assert_eq!(report.median_error_kg, 25.0);
    }

    #[test]
    fn zero_actual_counts_as_zero_percent() {
        let report = backtest(&[prediction(4, 10.0, 0.5)], &[harvest(4, 0.0)]).unwrap();
        assert_eq!(report.rows[0].error_pct, 0.0);
        assert_eq!(report.bias.calibration, Calibration::Overestimates);
    }

    #[test]
    fn nothing_matched_gives_no_report() {
        assert!(backtest(&[prediction(4, 10.0, 0.5)], &[]).is_none());
    }
}
