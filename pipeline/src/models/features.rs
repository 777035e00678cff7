//! The fixed, ordered feature vector fed to the regressors.
//!
//! Optional fields are values a row may legitimately lack (first day of a
//! season, no plants in the ground). They are zero-filled by
//! [`FeatureSet::to_vec`], which is the only way a vector reaches a model,
//! so training and inference impute identically.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub variety_code: f64,
    pub plants_count: f64,

    // Calendar
    pub month: f64,
    pub iso_week: f64,
    pub day_of_year: f64,
    pub day_of_week: f64,
    pub days_since_season_start: f64,

    // Same-day weather
    pub temperature_mean: f64,
    pub humidity_mean: f64,
    pub precipitation: f64,
    pub sunshine_duration: f64,
    pub solar_radiation: f64,

    // Trailing weather windows, current day included
    pub temp_mean_7d: f64,
    pub humidity_mean_7d: f64,
    pub precipitation_sum_7d: f64,
    pub sunshine_sum_7d: f64,
    pub solar_radiation_mean_7d: f64,
    pub temp_mean_14d: f64,
    pub humidity_mean_14d: f64,
    pub precipitation_sum_14d: f64,
    pub sunshine_sum_14d: f64,
    pub solar_radiation_mean_14d: f64,

    pub temp_delta: Option<f64>,

    // Prior-day capacity history
    pub capacity_prev_day: Option<f64>,
    pub capacity_mean_7d: Option<f64>,
    pub capacity_mean_14d: Option<f64>,
    pub capacity_per_plant: Option<f64>,
}

impl FeatureSet {
    pub const DIM: usize = 27;

    /// Feature names in vector order
    pub const NAMES: [&'static str; Self::DIM] = [
        "variety_code",
        "plants_count",
        "month",
        "iso_week",
        "day_of_year",
        "day_of_week",
        "days_since_season_start",
        "temperature_mean",
        "humidity_mean",
        "precipitation",
        "sunshine_duration",
        "solar_radiation",
        "temp_mean_7d",
        "humidity_mean_7d",
        "precipitation_sum_7d",
        "sunshine_sum_7d",
        "solar_radiation_mean_7d",
        "temp_mean_14d",
        "humidity_mean_14d",
        "precipitation_sum_14d",
        "sunshine_sum_14d",
        "solar_radiation_mean_14d",
        "temp_delta",
        "capacity_prev_day",
        "capacity_mean_7d",
        "capacity_mean_14d",
        "capacity_per_plant",
    ];

    pub fn names() -> Vec<String> {
        Self::NAMES.iter().map(|n| n.to_string()).collect()
    }

    /// Assemble the model input, zero-filling missing values.
    pub fn to_vec(&self) -> Vec<f64> {
        let fill = |v: Option<f64>| v.unwrap_or(0.0);
        vec![
            self.variety_code,
            self.plants_count,
            self.month,
            self.iso_week,
            self.day_of_year,
            self.day_of_week,
            self.days_since_season_start,
            self.temperature_mean,
            self.humidity_mean,
            self.precipitation,
            self.sunshine_duration,
            self.solar_radiation,
            self.temp_mean_7d,
            self.humidity_mean_7d,
            self.precipitation_sum_7d,
            self.sunshine_sum_7d,
            self.solar_radiation_mean_7d,
            self.temp_mean_14d,
            self.humidity_mean_14d,
            self.precipitation_sum_14d,
            self.sunshine_sum_14d,
            self.solar_radiation_mean_14d,
            fill(self.temp_delta),
            fill(self.capacity_prev_day),
            fill(self.capacity_mean_7d),
            fill(self.capacity_mean_14d),
            fill(self.capacity_per_plant),
        ]
    }

    /// Number of optional features that are missing
    pub fn missing_count(&self) -> usize {
        [
            self.temp_delta,
            self.capacity_prev_day,
            self.capacity_mean_7d,
            self.capacity_mean_14d,
            self.capacity_per_plant,
        ]
        .iter()
        .filter(|v| v.is_none())
        .count()
    }
}
