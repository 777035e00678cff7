//! Per-day, per-variety tables produced by the pipeline stages

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::{HarvestObservation, VarietyId, WeatherObservation};

use super::FeatureSet;

/// A growing season: one variety over one harvest year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeasonKey {
    pub variety_id: VarietyId,
    pub year: i32,
}

/// Harvest row joined with the weather of its date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub date: NaiveDate,
    pub variety_id: VarietyId,
    pub day_number: i32,
    pub plants_count: u32,
    pub kg_observed: f64,
    pub year: i32,
    pub weather: WeatherObservation,
}

impl MergedRecord {
    pub fn new(harvest: &HarvestObservation, weather: &WeatherObservation) -> Self {
        Self {
            date: harvest.date,
            variety_id: harvest.variety_id,
            day_number: harvest.day_number,
            plants_count: harvest.plants_count,
            kg_observed: harvest.kg_observed,
            year: harvest.year,
            weather: weather.clone(),
        }
    }

    pub fn season(&self) -> SeasonKey {
        SeasonKey {
            variety_id: self.variety_id,
            year: self.year,
        }
    }
}

/// Outcome counters of a merge run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    pub harvest_rows: usize,
    pub weather_rows: usize,
    pub merged_rows: usize,
    pub invalid_harvest_rows: usize,
    pub invalid_weather_rows: usize,
    pub duplicate_harvest_rows: usize,
    pub duplicate_weather_rows: usize,
    /// Harvest rows dropped because their date had no weather
    pub missing_weather: Vec<(NaiveDate, VarietyId)>,
}

impl MergeReport {
    pub fn missing_weather_count(&self) -> usize {
        self.missing_weather.len()
    }

    pub fn dropped_rows(&self) -> usize {
        self.invalid_harvest_rows + self.duplicate_harvest_rows + self.missing_weather.len()
    }
}

/// Merged row with its harvest fraction and, where defined, its capacity.
///
/// Rows on zero-fraction days keep `kg_biological = None`; they remain in
/// the table as history but never become modeling rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRecord {
    pub record: MergedRecord,
    pub fraction: f64,
    pub kg_biological: Option<f64>,
}

impl CapacityRecord {
    pub fn is_modeling_row(&self) -> bool {
        self.kg_biological.is_some()
    }
}

/// Output of the capacity transform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityTable {
    /// Every merged row, sorted by (variety, date)
    pub rows: Vec<CapacityRecord>,
}

impl CapacityTable {
    pub fn modeling_rows(&self) -> impl Iterator<Item = &CapacityRecord> {
        self.rows.iter().filter(|r| r.is_modeling_row())
    }

    pub fn excluded_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_modeling_row()).count()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A modeling row: features plus the capacity target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeredRecord {
    pub date: NaiveDate,
    pub variety_id: VarietyId,
    pub plants_count: u32,
    pub kg_observed: f64,
    pub fraction: f64,
    pub kg_biological: f64,
    pub features: FeatureSet,
}

/// A season together with its first recorded date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonInfo {
    pub key: SeasonKey,
    pub start: NaiveDate,
}
