//! Weather records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Daily weather summary, shared by every variety on the farm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WeatherObservation {
    pub date: NaiveDate,
    /// °C
    pub temperature_max: f64,
    /// °C
    pub temperature_min: f64,
    /// °C
    pub temperature_mean: f64,
    /// %
    #[validate(range(min = 0.0, max = 100.0))]
    pub humidity_mean: f64,
    /// mm
    #[validate(range(min = 0.0))]
    pub precipitation: f64,
    /// hours
    #[validate(range(min = 0.0, max = 24.0))]
    pub sunshine_duration: f64,
    /// MJ/m²
    #[validate(range(min = 0.0))]
    pub solar_radiation: f64,
}
