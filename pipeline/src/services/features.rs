//! FeatureEngineer: causal features per (date, variety)
//!
//! Each season (variety, harvest year) is folded in date order through a
//! [`SeasonState`]. For a row dated `t` the state only holds rows and
//! weather-feed days dated before `t`; same-day weather is passed in
//! explicitly. Inference rebuilds a `SeasonState` from the history window
//! and asks it the same question, so both paths share one implementation.
//!
//! Windows are calendar based:
//! - weather, w days: `[max(t - w + 1, season_start), t]`, every feed day,
//!   with or without a harvest row
//! - capacity, w days: `[t - w, t - 1]`, rows with a defined capacity only

use std::collections::{BTreeMap, VecDeque};

use chrono::{Datelike, Duration, NaiveDate};

use super::merge::weather_by_date;
use crate::error::PipelineResult;
use crate::models::{
    CapacityRecord, CapacityTable, EngineeredRecord, FeatureSet, MergeReport, SeasonKey,
    VarietyEncoder, WeatherObservation,
};

/// Oldest history a feature may look at, in days before the target date
pub const HISTORY_LOOKBACK_DAYS: i64 = 14;

const SHORT_WINDOW_DAYS: i64 = 7;
const LONG_WINDOW_DAYS: i64 = 14;

/// Dated values kept in arrival order, trimmed from the front.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    entries: VecDeque<(NaiveDate, T)>,
}

impl<T> Default for RollingWindow<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<T> RollingWindow<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dates must arrive in non-decreasing order.
    pub fn push(&mut self, date: NaiveDate, value: T) {
        self.entries.push_back((date, value));
    }

    pub fn evict_before(&mut self, cutoff: NaiveDate) {
        while self.entries.front().map_or(false, |(d, _)| *d < cutoff) {
            self.entries.pop_front();
        }
    }

    /// Values dated in `[from, before)`
    pub fn between(&self, from: NaiveDate, before: NaiveDate) -> impl Iterator<Item = &T> + '_ {
        self.entries
            .iter()
            .filter(move |(d, _)| *d >= from && *d < before)
            .map(|(_, v)| v)
    }

    pub fn latest_between(&self, from: NaiveDate, before: NaiveDate) -> Option<&T> {
        self.entries
            .iter()
            .rev()
            .find(|(d, _)| *d >= from && *d < before)
            .map(|(_, v)| v)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.entries.back().map(|(d, _)| *d)
    }
}

/// Weather fields that feed rolling aggregates
#[derive(Debug, Clone, Copy)]
struct DailyWeather {
    temperature_mean: f64,
    humidity_mean: f64,
    precipitation: f64,
    sunshine_duration: f64,
    solar_radiation: f64,
}

impl From<&WeatherObservation> for DailyWeather {
    fn from(w: &WeatherObservation) -> Self {
        Self {
            temperature_mean: w.temperature_mean,
            humidity_mean: w.humidity_mean,
            precipitation: w.precipitation,
            sunshine_duration: w.sunshine_duration,
            solar_radiation: w.solar_radiation,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WeatherAggregate {
    temp_mean: f64,
    humidity_mean: f64,
    precipitation_sum: f64,
    sunshine_sum: f64,
    solar_radiation_mean: f64,
}

/// Rolling state of one season, advanced one observed row at a time.
#[derive(Debug, Clone)]
pub struct SeasonState {
    season_start: NaiveDate,
    weather: RollingWindow<DailyWeather>,
    capacity: RollingWindow<f64>,
}

impl SeasonState {
    pub fn new(season_start: NaiveDate) -> Self {
        Self {
            season_start,
            weather: RollingWindow::new(),
            capacity: RollingWindow::new(),
        }
    }

    pub fn season_start(&self) -> NaiveDate {
        self.season_start
    }

    /// Record a row once its features have been taken.
    ///
    /// `capacity` is `None` on zero-fraction days: their weather still
    /// counts, their yield does not.
    pub fn observe(&mut self, date: NaiveDate, weather: &WeatherObservation, capacity: Option<f64>) {
        self.push_weather(date, weather);
        if let Some(value) = capacity {
            self.capacity.push(date, value);
        }
        self.capacity
            .evict_before(date - Duration::days(HISTORY_LOOKBACK_DAYS - 1));
    }

    pub fn observe_row(&mut self, row: &CapacityRecord) {
        self.observe(row.record.date, &row.record.weather, row.kg_biological);
    }

    /// Take feed days in `[season_start, before)` newer than anything seen.
    pub fn observe_weather_before(
        &mut self,
        feed: &BTreeMap<NaiveDate, &WeatherObservation>,
        before: NaiveDate,
    ) {
        let from = self
            .weather
            .last_date()
            .map_or(self.season_start, |d| d + Duration::days(1))
            .max(self.season_start);
        if from >= before {
            return;
        }
        for (date, day) in feed.range(from..before) {
            self.push_weather(*date, day);
        }
    }

    /// A date already in the window keeps its first observation.
    fn push_weather(&mut self, date: NaiveDate, weather: &WeatherObservation) {
        if self.weather.last_date().map_or(false, |last| last >= date) {
            return;
        }
        self.weather.push(date, DailyWeather::from(weather));
        self.weather
            .evict_before(date - Duration::days(HISTORY_LOOKBACK_DAYS - 1));
    }

    /// Features for a row dated `date`, from prior rows plus same-day weather.
    pub fn features_for(
        &self,
        date: NaiveDate,
        plants_count: u32,
        weather: &WeatherObservation,
        variety_code: u32,
    ) -> FeatureSet {
        let today = DailyWeather::from(weather);
        let short = self.weather_window(date, today, SHORT_WINDOW_DAYS);
        let long = self.weather_window(date, today, LONG_WINDOW_DAYS);

        let lookback_start = date - Duration::days(HISTORY_LOOKBACK_DAYS);
        let capacity_prev_day = self.capacity.latest_between(lookback_start, date).copied();
        let capacity_mean = |days: i64| {
            mean(
                self.capacity
                    .between(date - Duration::days(days), date)
                    .copied(),
            )
        };

        let temp_delta = self
            .weather
            .latest_between(lookback_start, date)
            .map(|previous| weather.temperature_mean - previous.temperature_mean);

        let capacity_per_plant = match (capacity_prev_day, plants_count) {
            (Some(capacity), plants) if plants > 0 => Some(capacity / f64::from(plants)),
            _ => None,
        };

        FeatureSet {
            variety_code: f64::from(variety_code),
            plants_count: f64::from(plants_count),
            month: f64::from(date.month()),
            iso_week: f64::from(date.iso_week().week()),
            day_of_year: f64::from(date.ordinal()),
            day_of_week: f64::from(date.weekday().num_days_from_monday()),
            days_since_season_start: (date - self.season_start).num_days().max(0) as f64,
            temperature_mean: weather.temperature_mean,
            humidity_mean: weather.humidity_mean,
            precipitation: weather.precipitation,
            sunshine_duration: weather.sunshine_duration,
            solar_radiation: weather.solar_radiation,
            temp_mean_7d: short.temp_mean,
            humidity_mean_7d: short.humidity_mean,
            precipitation_sum_7d: short.precipitation_sum,
            sunshine_sum_7d: short.sunshine_sum,
            solar_radiation_mean_7d: short.solar_radiation_mean,
            temp_mean_14d: long.temp_mean,
            humidity_mean_14d: long.humidity_mean,
            precipitation_sum_14d: long.precipitation_sum,
            sunshine_sum_14d: long.sunshine_sum,
            solar_radiation_mean_14d: long.solar_radiation_mean,
            temp_delta,
            capacity_prev_day,
            capacity_mean_7d: capacity_mean(SHORT_WINDOW_DAYS),
            capacity_mean_14d: capacity_mean(LONG_WINDOW_DAYS),
            capacity_per_plant,
        }
    }

    fn weather_window(&self, date: NaiveDate, today: DailyWeather, days: i64) -> WeatherAggregate {
        let from = (date - Duration::days(days - 1)).max(self.season_start);
        let days: Vec<DailyWeather> = self
            .weather
            .between(from, date)
            .copied()
            .chain(std::iter::once(today))
            .collect();
        let n = days.len() as f64;
        let total = |f: fn(&DailyWeather) -> f64| days.iter().map(f).sum::<f64>();

        WeatherAggregate {
            temp_mean: total(|d| d.temperature_mean) / n,
            humidity_mean: total(|d| d.humidity_mean) / n,
            precipitation_sum: total(|d| d.precipitation),
            sunshine_sum: total(|d| d.sunshine_duration),
            solar_radiation_mean: total(|d| d.solar_radiation) / n,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Builds engineered records for training and feature sets for inference.
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    encoder: VarietyEncoder,
}

impl FeatureEngineer {
    pub fn new(encoder: VarietyEncoder) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> &VarietyEncoder {
        &self.encoder
    }

    /// Fold every season of the table against the weather feed; one record
    /// per row with a defined capacity, sorted by (date, variety).
    ///
    /// Feed rows are screened the way the merger screens them.
    pub fn engineer(
        &self,
        table: &CapacityTable,
        weather: &[WeatherObservation],
    ) -> PipelineResult<Vec<EngineeredRecord>> {
        let feed = weather_by_date(weather, &mut MergeReport::default());
        let mut seasons: BTreeMap<SeasonKey, Vec<&CapacityRecord>> = BTreeMap::new();
        for row in &table.rows {
            seasons.entry(row.record.season()).or_default().push(row);
        }

        let mut engineered = Vec::with_capacity(table.len());
        for (season, mut rows) in seasons {
            rows.sort_by_key(|r| r.record.date);
            let Some(first) = rows.first() else {
                continue;
            };
            let variety_code = self.encoder.code(season.variety_id)?;
            let mut state = SeasonState::new(first.record.date);

            for row in rows {
                state.observe_weather_before(&feed, row.record.date);
                if let Some(kg_biological) = row.kg_biological {
                    let record = &row.record;
                    let features = state.features_for(
                        record.date,
                        record.plants_count,
                        &record.weather,
                        variety_code,
                    );
                    engineered.push(EngineeredRecord {
                        date: record.date,
                        variety_id: record.variety_id,
                        plants_count: record.plants_count,
                        kg_observed: record.kg_observed,
                        fraction: row.fraction,
                        kg_biological,
                        features,
                    });
                }
                state.observe_row(row);
            }
        }

        engineered.sort_by_key(|r| (r.date, r.variety_id));
        tracing::info!("Engineered {} modeling rows", engineered.len());
        Ok(engineered)
    }

    /// Features for a date from the season's prior rows (ascending) and the
    /// feed days before `date`. Either may reach further back than the
    /// lookback; older entries are ignored.
    #[allow(clippy::too_many_arguments)]
    pub fn features_at(
        &self,
        season_start: NaiveDate,
        history: &[CapacityRecord],
        weather_history: &[WeatherObservation],
        date: NaiveDate,
        variety_code: u32,
        plants_count: u32,
        weather: &WeatherObservation,
    ) -> FeatureSet {
        let feed = weather_by_date(weather_history, &mut MergeReport::default());
        let mut state = SeasonState::new(season_start);
        for row in history.iter().filter(|r| r.record.date < date) {
            state.observe_weather_before(&feed, row.record.date);
            state.observe_row(row);
        }
        state.observe_weather_before(&feed, date);
        state.features_for(date, plants_count, weather, variety_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MergedRecord;
    use shared::VarietyId;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn weather(on: NaiveDate, temperature: f64, rain: f64) -> WeatherObservation {
        WeatherObservation {
            date: on,
            temperature_max: temperature + 6.0,
            temperature_min: temperature - 6.0,
            temperature_mean: temperature,
            humidity_mean: 60.0,
            precipitation: rain,
            sunshine_duration: 8.0,
            solar_radiation: 20.0,
        }
    }

    fn row(on: NaiveDate, variety: i64, capacity: Option<f64>, temperature: f64) -> CapacityRecord {
        CapacityRecord {
            record: MergedRecord {
                date: on,
                variety_id: VarietyId(variety),
                day_number: 1,
                plants_count: 1000,
                kg_observed: capacity.map_or(0.0, |c| c / 2.0),
                year: on.year(),
                weather: weather(on, temperature, 1.0),
            },
            fraction: if capacity.is_some() { 0.5 } else { 0.0 },
            kg_biological: capacity,
        }
    }

    // ========================================================================
    // Rolling window
    // ========================================================================

    #[test]
    fn window_evicts_from_front() {
        let mut window = RollingWindow::new();
        for day in 1..=5 {
            window.push(date(4, day), day as f64);
        }
        window.evict_before(date(4, 3));
        assert_eq!(window.between(date(4, 1), date(4, 6)).count(), 3);
        assert_eq!(window.last_date(), Some(date(4, 5)));
        let values: Vec<f64> = window.between(date(4, 1), date(4, 5)).copied().collect();
        assert_eq!(values, vec![3.0, 4.0]);
        assert_eq!(window.latest_between(date(4, 1), date(4, 5)), Some(&4.0));
    }

    // ========================================================================
    // Season state
    // ========================================================================

    #[test]
    fn first_day_of_season_has_no_history() {
        let state = SeasonState::new(date(4, 1));
        let features = state.features_for(date(4, 1), 1000, &weather(date(4, 1), 15.0, 2.0), 0);

        assert_eq!(features.temp_delta, None);
        assert_eq!(features.capacity_prev_day, None);
        assert_eq!(features.capacity_mean_7d, None);
        assert_eq!(features.capacity_per_plant, None);
        assert_eq!(features.days_since_season_start, 0.0);
        // Partial window: today only
        assert_eq!(features.temp_mean_7d, 15.0);
        assert_eq!(features.precipitation_sum_14d, 2.0);
    }

    #[test]
    fn capacity_history_excludes_same_day() {
        let mut state = SeasonState::new(date(4, 1));
        state.observe(date(4, 1), &weather(date(4, 1), 10.0, 0.0), Some(100.0));
        state.observe(date(4, 2), &weather(date(4, 2), 12.0, 0.0), Some(200.0));

        let features = state.features_for(date(4, 3), 50, &weather(date(4, 3), 15.0, 0.0), 0);

        assert_eq!(features.capacity_prev_day, Some(200.0));
        assert_eq!(features.capacity_mean_7d, Some(150.0));
        assert_eq!(features.capacity_per_plant, Some(4.0));
        assert_eq!(features.temp_delta, Some(3.0));
        assert!((features.temp_mean_7d - 37.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn sunday_weather_counts_but_not_its_capacity() {
        let mut state = SeasonState::new(date(4, 6));
        state.observe(date(4, 6), &weather(date(4, 6), 10.0, 0.0), Some(90.0));
        state.observe(date(4, 7), &weather(date(4, 7), 20.0, 4.0), None);

        let features = state.features_for(date(4, 8), 10, &weather(date(4, 8), 30.0, 0.0), 0);

        assert_eq!(features.capacity_prev_day, Some(90.0));
        assert_eq!(features.temp_delta, Some(10.0));
        assert_eq!(features.precipitation_sum_7d, 4.0);
        assert_eq!(features.temp_mean_7d, 20.0);
    }

    #[test]
    fn windows_drop_old_days() {
        let mut state = SeasonState::new(date(3, 1));
        state.observe(date(3, 1), &weather(date(3, 1), 10.0, 5.0), Some(500.0));

        let features = state.features_for(date(3, 20), 10, &weather(date(3, 20), 16.0, 0.0), 0);

        assert_eq!(features.capacity_prev_day, None);
        assert_eq!(features.capacity_mean_14d, None);
        assert_eq!(features.temp_delta, None);
        assert_eq!(features.precipitation_sum_14d, 0.0);
        assert_eq!(features.days_since_season_start, 19.0);
    }

    #[test]
    fn zero_plants_leaves_ratio_missing() {
        let mut state = SeasonState::new(date(4, 1));
        state.observe(date(4, 1), &weather(date(4, 1), 10.0, 0.0), Some(100.0));
        let features = state.features_for(date(4, 2), 0, &weather(date(4, 2), 10.0, 0.0), 0);
        assert_eq!(features.capacity_prev_day, Some(100.0));
        assert_eq!(features.capacity_per_plant, None);
    }

    // ========================================================================
    // Engineer
    // ========================================================================

    #[test]
    fn varieties_never_share_history() {
        let table = CapacityTable {
            rows: vec![
                row(date(4, 1), 1, Some(100.0), 10.0),
                row(date(4, 2), 1, Some(120.0), 11.0),
                row(date(4, 2), 2, Some(300.0), 11.0),
            ],
        };
        let engineer = FeatureEngineer::new(VarietyEncoder::fit([VarietyId(1), VarietyId(2)]));
        let records = engineer.engineer(&table, &[]).unwrap();

        let first_of_two = records.iter().find(|r| r.variety_id == VarietyId(2)).unwrap();
        assert_eq!(first_of_two.features.capacity_prev_day, None);
        assert_eq!(first_of_two.features.temp_delta, None);
        assert_eq!(first_of_two.features.variety_code, 1.0);
    }

    #[test]
    fn zero_fraction_rows_are_not_emitted() {
        let table = CapacityTable {
            rows: vec![
                row(date(4, 6), 1, Some(100.0), 10.0),
                row(date(4, 7), 1, None, 10.0),
                row(date(4, 8), 1, Some(100.0), 10.0),
            ],
        };
        let engineer = FeatureEngineer::new(VarietyEncoder::fit([VarietyId(1)]));
        let records = engineer.engineer(&table, &[]).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.date != date(4, 7)));
    }

    #[test]
    fn feed_days_without_harvest_fill_weather_windows() {
        let feed: Vec<WeatherObservation> = (1..=7)
            .map(|day| weather(date(4, day), if day == 4 { 45.0 } else { 10.0 }, 1.0))
            .collect();
        let table = CapacityTable {
            rows: vec![
                row(date(4, 1), 1, Some(100.0), 10.0),
                row(date(4, 7), 1, Some(100.0), 10.0),
            ],
        };
        let engineer = FeatureEngineer::new(VarietyEncoder::fit([VarietyId(1)]));
        let records = engineer.engineer(&table, &feed).unwrap();

        let last = records.iter().find(|r| r.date == date(4, 7)).unwrap();
        assert!((last.features.temp_mean_7d - 15.0).abs() < 1e-9);
        assert_eq!(last.features.precipitation_sum_7d, 7.0);
        // Previous calendar day from the feed, not the last harvest row
        assert_eq!(last.features.temp_delta, Some(0.0));
        assert_eq!(last.features.capacity_prev_day, Some(100.0));
    }

    #[test]
    fn feed_days_before_season_start_are_ignored() {
        let feed: Vec<WeatherObservation> = (1..=5)
            .map(|day| weather(date(4, day), 40.0, 3.0))
            .collect();
        let table = CapacityTable {
            rows: vec![row(date(4, 5), 1, Some(100.0), 40.0)],
        };
        let engineer = FeatureEngineer::new(VarietyEncoder::fit([VarietyId(1)]));
        let records = engineer.engineer(&table, &feed).unwrap();

        assert_eq!(records[0].features.temp_delta, None);
        assert_eq!(records[0].features.precipitation_sum_14d, 1.0);
    }

    #[test]
    fn inference_path_matches_training_fold() {
        let feed: Vec<WeatherObservation> = (1..=24)
            .map(|day| weather(date(4, day), 8.0 + day as f64 * 0.5, f64::from(day % 3)))
            .collect();
        // Every fourth day has no harvest row, only feed weather
        let rows: Vec<CapacityRecord> = (1..=20)
            .filter(|day| day % 4 != 0)
            .map(|day| {
                let on = date(4, day);
                let capacity = (on.weekday().num_days_from_monday() < 6).then(|| 50.0 + day as f64);
                let mut row = row(on, 1, capacity, 0.0);
                row.record.weather = feed[day as usize - 1].clone();
                row
            })
            .collect();
        let engineer = FeatureEngineer::new(VarietyEncoder::fit([VarietyId(1)]));
        let records = engineer
            .engineer(&CapacityTable { rows: rows.clone() }, &feed)
            .unwrap();

        for record in &records {
            let lookback = record.date - Duration::days(HISTORY_LOOKBACK_DAYS);
            let history: Vec<CapacityRecord> = rows
                .iter()
                .filter(|r| r.record.date < record.date && r.record.date >= lookback)
                .cloned()
                .collect();
            let weather_history: Vec<WeatherObservation> = feed
                .iter()
                .filter(|w| w.date < record.date && w.date >= lookback)
                .cloned()
                .collect();
            let target = rows.iter().find(|r| r.record.date == record.date).unwrap();
            let rebuilt = engineer.features_at(
                date(4, 1),
                &history,
                &weather_history,
                record.date,
                0,
                target.record.plants_count,
                &target.record.weather,
            );
            assert_eq!(rebuilt, record.features, "mismatch on {}", record.date);
        }
    }

    #[test]
    fn unknown_variety_fails() {
        let table = CapacityTable {
            rows: vec![row(date(4, 1), 7, Some(100.0), 10.0)],
        };
        let engineer = FeatureEngineer::new(VarietyEncoder::fit([VarietyId(1)]));
        assert!(engineer.engineer(&table, &[]).is_err());
    }
}
