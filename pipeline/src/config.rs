//! Configuration management for the capacity forecasting pipeline
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with SCF__ prefix

use chrono::NaiveDate;
use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::HarvestFractionTable;

use crate::error::{PipelineError, PipelineResult};
use crate::ml::{Algorithm, GradientBoostingParams, RandomForestParams};

/// Main pipeline configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Input feeds and output locations used by the driver binary
    #[serde(default)]
    pub data: DataConfig,

    /// Split, seed and cross-validation settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Picking schedule
    #[serde(default)]
    pub harvest: HarvestConfig,

    #[serde(default)]
    pub random_forest: RandomForestParams,

    #[serde(default)]
    pub gradient_boosting: GradientBoostingParams,

    #[serde(default)]
    pub forecast: ForecastConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub harvest_csv: String,
    pub weather_csv: String,
    pub plants_csv: String,
    /// Where the trained model artifact is written and read
    pub artifact_path: String,
    pub predictions_csv: String,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PipelineConfig {
    /// Share of the chronologically ordered rows used for training
    pub train_ratio: f64,

    /// Seed for every random draw in training
    pub seed: u64,

    /// Forward-chaining cross-validation splits (0 disables)
    pub cv_folds: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default)]
pub struct HarvestConfig {
    /// Weekday fractions, Monday first
    pub fractions: HarvestFractionTable,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of days forecast per variety
    pub horizon_days: u32,

    /// First forecast day, today when unset
    pub start_date: Option<NaiveDate>,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("SCF_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("pipeline.train_ratio", 0.8)?
            .set_default("pipeline.seed", 42)?
            .set_default("pipeline.cv_folds", 5)?
            .set_default("forecast.horizon_days", 7)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (SCF__ prefix)
            .add_source(
                Environment::with_prefix("SCF")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("harvest.fractions")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings that would make a training run meaningless
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.pipeline.train_ratio > 0.0 && self.pipeline.train_ratio < 1.0) {
            return Err(PipelineError::Configuration(format!(
                "pipeline.train_ratio must be strictly between 0 and 1, got {}",
                self.pipeline.train_ratio
            )));
        }
        if self.forecast.horizon_days == 0 {
            return Err(PipelineError::Configuration(
                "forecast.horizon_days must be at least 1".to_string(),
            ));
        }

        let forest = &self.random_forest;
        if forest.n_estimators == 0 {
            return Err(PipelineError::Configuration(
                "random_forest.n_estimators must be at least 1".to_string(),
            ));
        }
        if forest.max_features == Some(0) {
            return Err(PipelineError::Configuration(
                "random_forest.max_features must be at least 1 when set".to_string(),
            ));
        }

        let boosting = &self.gradient_boosting;
        if boosting.n_estimators == 0 {
            return Err(PipelineError::Configuration(
                "gradient_boosting.n_estimators must be at least 1".to_string(),
            ));
        }
        if !(boosting.learning_rate > 0.0 && boosting.learning_rate <= 1.0) {
            return Err(PipelineError::Configuration(format!(
                "gradient_boosting.learning_rate must be in (0, 1], got {}",
                boosting.learning_rate
            )));
        }
        if !(boosting.subsample > 0.0 && boosting.subsample <= 1.0) {
            return Err(PipelineError::Configuration(format!(
                "gradient_boosting.subsample must be in (0, 1], got {}",
                boosting.subsample
            )));
        }
        Ok(())
    }

    /// Candidate algorithms in evaluation order
    pub fn candidates(&self) -> Vec<Algorithm> {
        vec![
            Algorithm::RandomForest(self.random_forest),
            Algorithm::GradientBoosting(self.gradient_boosting),
        ]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            data: DataConfig::default(),
            pipeline: PipelineConfig::default(),
            harvest: HarvestConfig::default(),
            random_forest: RandomForestParams::default(),
            gradient_boosting: GradientBoostingParams::default(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            harvest_csv: "data/harvests.csv".to_string(),
            weather_csv: "data/weather.csv".to_string(),
            plants_csv: "data/plants.csv".to_string(),
            artifact_path: "artifacts/model.json".to_string(),
            predictions_csv: "artifacts/predictions.csv".to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.8,
            seed: 42,
            cv_folds: 5,
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: 7,
            start_date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.pipeline.train_ratio, 0.8);
        assert_eq!(config.pipeline.seed, 42);
        assert_eq!(config.random_forest.n_estimators, 200);
        assert_eq!(config.random_forest.max_depth, 15);
        assert_eq!(config.gradient_boosting.learning_rate, 0.05);
        assert_eq!(config.harvest.fractions.fraction_at(6), Some(0.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn candidates_keep_configured_order() {
        let names: Vec<&str> = Config::default().candidates().iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["Random Forest", "Gradient Boosting"]);
    }

    #[test]
    fn train_ratio_bounds_are_enforced() {
        let mut config = Config::default();
        config.pipeline.train_ratio = 1.0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let mut config = Config::default();
        config.forecast.horizon_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn hyper_parameters_are_checked_up_front() {
        let mut config = Config::default();
        config.random_forest.n_estimators = 0;
        assert_eq!(config.validate().unwrap_err().code(), "CONFIGURATION_ERROR");

        let mut config = Config::default();
        config.random_forest.max_features = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gradient_boosting.n_estimators = 0;
        assert!(config.validate().is_err());

        for learning_rate in [0.0, -0.1, 1.5, f64::NAN] {
            let mut config = Config::default();
            config.gradient_boosting.learning_rate = learning_rate;
            assert!(config.validate().is_err(), "learning_rate {learning_rate}");
        }

        let mut config = Config::default();
        config.gradient_boosting.subsample = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gradient_boosting.learning_rate = 1.0;
        config.gradient_boosting.subsample = 0.5;
        config.random_forest.max_features = Some(5);
        assert!(config.validate().is_ok());
    }
}
