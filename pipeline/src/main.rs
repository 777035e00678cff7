//! Strawberry Capacity Forecasting - pipeline driver
//!
//! Loads the CSV feeds named in the configuration, then trains a model,
//! forecasts the coming days, or backtests stored predictions.

use std::fs::{self, File};
use std::path::Path;

use anyhow::Context;
use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strawberry_capacity_pipeline::config::Config;
use strawberry_capacity_pipeline::models::{
    DateRange, HarvestObservation, PlantConfiguration, PredictionResult,
    TrainedModel, WeatherObservation,
};
use strawberry_capacity_pipeline::services::{
    backtest, InMemoryHistory, Merger, Predictor, TrainingPipeline,
};

#[derive(Parser, Debug)]
#[command(name = "scf-pipeline", about = "Strawberry biological-capacity forecasting")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train, evaluate and write the model artifact
    Train,

    /// Forecast every variety over the configured horizon
    Forecast {
        /// First forecast day (default: tomorrow)
        #[arg(long)]
        start_date: Option<NaiveDate>,
    },

    /// Compare stored predictions with recorded harvests
    Backtest,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scf_pipeline=info,strawberry_capacity_pipeline=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    config.validate()?;

    tracing::info!("Strawberry Capacity Forecasting pipeline");
    tracing::info!("Environment: {}", config.environment);

    match Args::parse().command.unwrap_or(Command::Train) {
        Command::Train => train(&config),
        Command::Forecast { start_date } => forecast(&config, start_date),
        Command::Backtest => run_backtest(&config),
    }
}

fn read_csv<T: DeserializeOwned>(path: &str) -> anyhow::Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("opening {path}"))?;
    let mut reader = csv::Reader::from_reader(file);
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .with_context(|| format!("reading {path}"))?;
    tracing::info!("Loaded {} rows from {}", rows.len(), path);
    Ok(rows)
}

fn ensure_parent(path: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

fn load_model(config: &Config) -> anyhow::Result<TrainedModel> {
    let path = &config.data.artifact_path;
    let json = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    Ok(TrainedModel::from_json(&json)?)
}

fn train(config: &Config) -> anyhow::Result<()> {
    let harvests: Vec<HarvestObservation> = read_csv(&config.data.harvest_csv)?;
    let weather: Vec<WeatherObservation> = read_csv(&config.data.weather_csv)?;

    let outcome = TrainingPipeline::new(config.clone()).run(&harvests, &weather)?;

    tracing::info!(
        "Dataset summary: {}",
        serde_json::to_string(&outcome.summary)?
    );
    tracing::info!("Training report: {}", serde_json::to_string(&outcome.report())?);
    for importance in outcome.model.feature_importances.iter().take(10) {
        tracing::info!("  {:<28} {:.4}", importance.feature, importance.importance);
    }

    ensure_parent(&config.data.artifact_path)?;
    fs::write(&config.data.artifact_path, outcome.model.to_json()?)
        .with_context(|| format!("writing {}", config.data.artifact_path))?;
    tracing::info!(
        "Model {} ({}) written to {}",
        outcome.model.model_id,
        outcome.model.algorithm,
        config.data.artifact_path
    );
    Ok(())
}

fn forecast(config: &Config, start_date: Option<NaiveDate>) -> anyhow::Result<()> {
    let predictor = Predictor::new(load_model(config)?)?;

    let harvests: Vec<HarvestObservation> = read_csv(&config.data.harvest_csv)?;
    let weather: Vec<WeatherObservation> = read_csv(&config.data.weather_csv)?;
    let plants: Vec<PlantConfiguration> = read_csv(&config.data.plants_csv)?;

    let (merged, _) = Merger::new().merge(&harvests, &weather);
    let varieties = predictor.model().variety_encoder.varieties().to_vec();
    let history = InMemoryHistory::new(merged, weather);

    let start = start_date
        .or(config.forecast.start_date)
        .unwrap_or_else(|| Local::now().date_naive() + Duration::days(1));
    let end = start + Duration::days(i64::from(config.forecast.horizon_days) - 1);
    let predictions = predictor.forecast(&varieties, &plants, DateRange::new(start, end), &history)?;

    ensure_parent(&config.data.predictions_csv)?;
    let mut writer = csv::Writer::from_path(&config.data.predictions_csv)
        .with_context(|| format!("creating {}", config.data.predictions_csv))?;
    for prediction in &predictions {
        writer.serialize(prediction)?;
    }
    writer.flush()?;
    tracing::info!(
        "{} predictions for {}..={} written to {}",
        predictions.len(),
        start,
        end,
        config.data.predictions_csv
    );
    Ok(())
}

fn run_backtest(config: &Config) -> anyhow::Result<()> {
    let predictions: Vec<PredictionResult> = read_csv(&config.data.predictions_csv)?;
    let harvests: Vec<HarvestObservation> = read_csv(&config.data.harvest_csv)?;

    match backtest(&predictions, &harvests) {
        Some(report) => tracing::info!("Backtest report: {}", serde_json::to_string_pretty(&report)?),
        None => tracing::warn!("No prediction could be matched with a harvest"),
    }
    Ok(())
}
