//! Accuracy reports

use serde::{Deserialize, Serialize};

/// MAE, RMSE, R² and MAPE over one set of predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    /// Percent, over rows with a positive actual value (0 when there are none)
    pub mape: f64,
    pub samples: usize,
}

/// Distribution of absolute errors
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}
