//! Prediction request and result records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::VarietyId;

/// Request for a yield forecast on a future date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub date: NaiveDate,
    pub variety_id: VarietyId,
    pub plants_count: u32,
}

/// Forecast for one (date, variety)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub date: NaiveDate,
    pub variety_id: VarietyId,
    pub plants_count: u32,
    /// What every plant would yield if all were picked
    pub predicted_kg_biological: f64,
    /// What the picking schedule is expected to bring in
    pub predicted_kg_observed: f64,
    pub fraction_used: f64,
}
