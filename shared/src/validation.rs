//! Validation utilities for harvest and weather records
//!
//! Rows failing these checks are dropped by the merge step rather than
//! patched, so every check here is a hard rejection.

use validator::Validate;

use crate::models::{HarvestObservation, WeatherObservation};

// ============================================================================
// Harvest Schedule Validations
// ============================================================================

/// Validate a single weekday fraction (0 means no picking that day)
pub fn validate_fraction(fraction: f64) -> Result<(), &'static str> {
    if !fraction.is_finite() {
        return Err("Harvest fraction must be a finite number");
    }
    if !(0.0..=1.0).contains(&fraction) {
        return Err("Harvest fraction must be between 0 and 1");
    }
    Ok(())
}

/// Validate a full weekday table, Monday first
pub fn validate_fraction_table(fractions: &[f64]) -> Result<(), &'static str> {
    if fractions.len() != 7 {
        return Err("Harvest fraction table must have exactly 7 entries");
    }
    for fraction in fractions {
        validate_fraction(*fraction)?;
    }
    if !fractions.iter().any(|f| *f > 0.0) {
        return Err("Harvest fraction table must contain at least one picking day");
    }
    Ok(())
}

// ============================================================================
// Record Validations
// ============================================================================

/// Validate a harvest row before it enters the modeling set
pub fn validate_harvest(harvest: &HarvestObservation) -> Result<(), &'static str> {
    if !harvest.kg_observed.is_finite() {
        return Err("Observed yield must be a finite number");
    }
    harvest
        .validate()
        .map_err(|_| "Harvest record has out-of-range fields")?;
    Ok(())
}

/// Validate a weather row before it is joined to harvests
pub fn validate_weather(weather: &WeatherObservation) -> Result<(), &'static str> {
    let values = [
        weather.temperature_max,
        weather.temperature_min,
        weather.temperature_mean,
        weather.humidity_mean,
        weather.precipitation,
        weather.sunshine_duration,
        weather.solar_radiation,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        return Err("Weather values must be finite numbers");
    }
    if weather.temperature_min > weather.temperature_max {
        return Err("Minimum temperature exceeds maximum temperature");
    }
    weather
        .validate()
        .map_err(|_| "Weather record has out-of-range fields")?;
    Ok(())
}
