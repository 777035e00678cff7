//! Synthetic farm data shared by the integration tests

#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use strawberry_capacity_pipeline::config::Config;
use strawberry_capacity_pipeline::ml::{GradientBoostingParams, RandomForestParams};
use strawberry_capacity_pipeline::models::{
    HarvestFractionTable, HarvestObservation, VarietyId, WeatherObservation,
};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn weather_on(on: NaiveDate, temperature: f64) -> WeatherObservation {
    WeatherObservation {
        date: on,
        temperature_max: temperature + 7.0,
        temperature_min: temperature - 7.0,
        temperature_mean: temperature,
        humidity_mean: 65.0,
        precipitation: 0.5,
        sunshine_duration: 8.0,
        solar_radiation: 18.0,
    }
}

/// Daily weather for `days` days, seasonal warming plus noise
pub fn synthetic_weather(start: NaiveDate, days: i64, seed: u64) -> Vec<WeatherObservation> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..days)
        .map(|offset| {
            let on = start + Duration::days(offset);
            let temperature = 12.0 + offset as f64 * 0.08 + rng.gen_range(-2.0..2.0);
            WeatherObservation {
                date: on,
                temperature_max: temperature + rng.gen_range(4.0..8.0),
                temperature_min: temperature - rng.gen_range(4.0..8.0),
                temperature_mean: temperature,
                humidity_mean: rng.gen_range(45.0..90.0),
                precipitation: if rng.gen_bool(0.3) { rng.gen_range(0.0..12.0) } else { 0.0 },
                sunshine_duration: rng.gen_range(2.0..12.0),
                solar_radiation: rng.gen_range(8.0..26.0),
            }
        })
        .collect()
}

/// Capacity a synthetic plot produces: grows with temperature, scaled by plants
pub fn synthetic_capacity(plants: u32, temperature: f64, day_in_season: i64) -> f64 {
    let ramp = (day_in_season as f64 / 30.0).min(1.0);
    f64::from(plants) * (0.01 + 0.002 * temperature) * (0.5 + 0.5 * ramp)
}

/// One harvest row per day and variety, observed through the default
/// weekday fractions (nothing picked on Sundays)
pub fn synthetic_harvests(
    varieties: &[(i64, u32)],
    weather: &[WeatherObservation],
) -> Vec<HarvestObservation> {
    let fractions = HarvestFractionTable::default();
    let start = weather.first().map(|w| w.date).unwrap();
    let mut rows = Vec::new();
    for &(variety, plants) in varieties {
        for day in weather {
            let offset = (day.date - start).num_days();
            let capacity = synthetic_capacity(plants, day.temperature_mean, offset);
            let fraction = fractions.fraction_for(day.date).unwrap();
            rows.push(HarvestObservation {
                date: day.date,
                variety_id: VarietyId(variety),
                day_number: offset as i32 + 1,
                plants_count: plants,
                kg_observed: capacity * fraction,
                year: day.date.year(),
            });
        }
    }
    rows
}

/// Configuration with small ensembles so tests stay fast
pub fn small_config() -> Config {
    let mut config = Config::default();
    config.pipeline.cv_folds = 2;
    config.random_forest = RandomForestParams {
        n_estimators: 12,
        max_depth: 6,
        ..RandomForestParams::default()
    };
    config.gradient_boosting = GradientBoostingParams {
        n_estimators: 30,
        max_depth: 3,
        learning_rate: 0.2,
        ..GradientBoostingParams::default()
    };
    config
}
