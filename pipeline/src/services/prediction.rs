//! Predictor: serves the stored model for future dates
//!
//! History is pulled through [`HistorySource`], implemented by whatever
//! storage the caller uses; [`InMemoryHistory`] covers tables already in
//! memory.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use shared::plants_on;

use super::capacity::CapacityTransformer;
use super::features::{FeatureEngineer, HISTORY_LOOKBACK_DAYS};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{
    CapacityRecord, DateRange, MergedRecord, PlantConfiguration, PredictionRequest,
    PredictionResult, SeasonInfo, SeasonKey, TrainedModel, VarietyId, WeatherObservation,
};

/// Read access to past harvests and weather
pub trait HistorySource {
    /// Latest season of the variety whose first record is on or before `date`
    fn season_for(&self, variety_id: VarietyId, date: NaiveDate) -> Option<SeasonInfo>;

    /// Rows of a season dated in `[from, before)`, ascending by date
    fn season_records(&self, season: SeasonKey, from: NaiveDate, before: NaiveDate) -> Vec<MergedRecord>;

    fn weather_on(&self, date: NaiveDate) -> Option<WeatherObservation>;
}

/// History backed by merged records and a weather table
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    seasons: BTreeMap<SeasonKey, Vec<MergedRecord>>,
    weather: BTreeMap<NaiveDate, WeatherObservation>,
}

impl InMemoryHistory {
    pub fn new(records: Vec<MergedRecord>, weather: Vec<WeatherObservation>) -> Self {
        let mut seasons: BTreeMap<SeasonKey, Vec<MergedRecord>> = BTreeMap::new();
        for record in records {
            seasons.entry(record.season()).or_default().push(record);
        }
        for rows in seasons.values_mut() {
            rows.sort_by_key(|r| r.date);
        }
        let mut by_date = BTreeMap::new();
        for day in weather {
            by_date.entry(day.date).or_insert(day);
        }
        Self {
            seasons,
            weather: by_date,
        }
    }

    /// Add weather (typically a forecast feed); later rows replace earlier ones.
    pub fn extend_weather(&mut self, weather: impl IntoIterator<Item = WeatherObservation>) {
        self.weather.extend(weather.into_iter().map(|w| (w.date, w)));
    }

    pub fn varieties(&self) -> Vec<VarietyId> {
        let mut ids: Vec<VarietyId> = self.seasons.keys().map(|k| k.variety_id).collect();
        ids.dedup();
        ids
    }
}

impl HistorySource for InMemoryHistory {
    fn season_for(&self, variety_id: VarietyId, date: NaiveDate) -> Option<SeasonInfo> {
        self.seasons
            .iter()
            .filter(|(key, _)| key.variety_id == variety_id)
            .filter_map(|(key, rows)| rows.first().map(|first| SeasonInfo { key: *key, start: first.date }))
            .filter(|season| season.start <= date)
            .max_by_key(|season| season.start)
    }

    fn season_records(&self, season: SeasonKey, from: NaiveDate, before: NaiveDate) -> Vec<MergedRecord> {
        self.seasons
            .get(&season)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.date >= from && r.date < before)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn weather_on(&self, date: NaiveDate) -> Option<WeatherObservation> {
        self.weather.get(&date).cloned()
    }
}

pub struct Predictor {
    model: TrainedModel,
    engineer: FeatureEngineer,
    transformer: CapacityTransformer,
}

impl Predictor {
    /// Wrap an artifact, refusing one built for another feature layout.
    pub fn new(model: TrainedModel) -> PipelineResult<Self> {
        model.check_schema()?;
        let engineer = FeatureEngineer::new(model.variety_encoder.clone());
        let transformer = CapacityTransformer::new(model.fraction_table);
        Ok(Self {
            model,
            engineer,
            transformer,
        })
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Predict one day from the season's lookback window.
    ///
    /// Fails with `InsufficientHistory` when no season has started or the
    /// lookback holds no record of it, and with `MissingWeather` when the
    /// day has no weather.
    pub fn predict<H: HistorySource + ?Sized>(
        &self,
        request: &PredictionRequest,
        history: &H,
    ) -> PipelineResult<PredictionResult> {
        let variety_code = self.engineer.encoder().code(request.variety_id)?;

        let season = history
            .season_for(request.variety_id, request.date)
            .ok_or_else(|| PipelineError::InsufficientHistory {
                variety_id: request.variety_id,
                date: request.date,
                reason: "no season of this variety has started yet".to_string(),
            })?;

        let weather = history
            .weather_on(request.date)
            .ok_or(PipelineError::MissingWeather {
                date: request.date,
                variety_id: request.variety_id,
            })?;

        let from = (request.date - Duration::days(HISTORY_LOOKBACK_DAYS)).max(season.start);
        let window = history
            .season_records(season.key, from, request.date)
            .into_iter()
            .map(|r| self.transformer.transform_record(r))
            .collect::<PipelineResult<Vec<CapacityRecord>>>()?;
        if window.is_empty() {
            return Err(PipelineError::InsufficientHistory {
                variety_id: request.variety_id,
                date: request.date,
                reason: format!("no record in the {HISTORY_LOOKBACK_DAYS}-day lookback"),
            });
        }
        let weather_history: Vec<WeatherObservation> = (0..(request.date - from).num_days())
            .filter_map(|offset| history.weather_on(from + Duration::days(offset)))
            .collect();

        let features = self.engineer.features_at(
            season.start,
            &window,
            &weather_history,
            request.date,
            variety_code,
            request.plants_count,
            &weather,
        );
        tracing::debug!(
            "Features for {} on {}: {} missing values zero-filled",
            request.variety_id,
            request.date,
            features.missing_count()
        );

        let predicted_kg_biological = self.model.predict_capacity(&features);
        let fraction_used = self.transformer.fraction_for(request.date)?;

        Ok(PredictionResult {
            date: request.date,
            variety_id: request.variety_id,
            plants_count: request.plants_count,
            predicted_kg_biological,
            predicted_kg_observed: predicted_kg_biological * fraction_used,
            fraction_used,
        })
    }

    /// Predict every day of `range` for each variety, using the plant
    /// configuration active on each date.
    ///
    /// Days with no plants are skipped, as are requests lacking history or
    /// weather; both are logged.
    pub fn forecast<H: HistorySource + ?Sized>(
        &self,
        varieties: &[VarietyId],
        plants: &[PlantConfiguration],
        range: DateRange,
        history: &H,
    ) -> PipelineResult<Vec<PredictionResult>> {
        let mut results = Vec::new();
        for &variety_id in varieties {
            for date in range.iter_days() {
                let plants_count = plants_on(plants, variety_id, date);
                if plants_count == 0 {
                    tracing::warn!("No plant configuration for {} on {}, skipping", variety_id, date);
                    continue;
                }
                let request = PredictionRequest {
                    date,
                    variety_id,
                    plants_count,
                };
                match self.predict(&request, history) {
                    Ok(result) => results.push(result),
                    Err(e) if e.is_recoverable() => {
                        tracing::warn!("Skipping {} on {}: {}", variety_id, date, e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        tracing::info!("Forecast produced {} predictions", results.len());
        Ok(results)
    }
}
