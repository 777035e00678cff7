//! Merger: joins harvest rows with the weather of their date

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use shared::{validate_harvest, validate_weather};

use crate::models::{HarvestObservation, MergeReport, MergedRecord, WeatherObservation};

/// Builds the per-day, per-variety table.
///
/// Malformed rows are dropped one by one and counted; a harvest date
/// without weather drops that harvest row (weather is never fabricated).
#[derive(Debug, Clone, Default)]
pub struct Merger;

impl Merger {
    pub fn new() -> Self {
        Self
    }

    /// Merge the two feeds. Output is sorted by (variety, date).
    pub fn merge(
        &self,
        harvests: &[HarvestObservation],
        weather: &[WeatherObservation],
    ) -> (Vec<MergedRecord>, MergeReport) {
        let mut report = MergeReport {
            harvest_rows: harvests.len(),
            weather_rows: weather.len(),
            ..MergeReport::default()
        };

        let weather_by_date = weather_by_date(weather, &mut report);
        if report.invalid_weather_rows + report.duplicate_weather_rows > 0 {
            tracing::warn!(
                "Dropped {} invalid and {} duplicate weather rows",
                report.invalid_weather_rows,
                report.duplicate_weather_rows
            );
        }

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(harvests.len());
        for harvest in harvests {
            if let Err(reason) = validate_harvest(harvest) {
                tracing::debug!(
                    "Dropping harvest {} / {}: {}",
                    harvest.date,
                    harvest.variety_id,
                    reason
                );
                report.invalid_harvest_rows += 1;
                continue;
            }
            if !seen.insert((harvest.date, harvest.variety_id)) {
                report.duplicate_harvest_rows += 1;
                continue;
            }
            match weather_by_date.get(&harvest.date) {
                Some(day) => records.push(MergedRecord::new(harvest, day)),
                None => report.missing_weather.push((harvest.date, harvest.variety_id)),
            }
        }

        records.sort_by_key(|r| (r.variety_id, r.date));
        report.merged_rows = records.len();

        if !report.missing_weather.is_empty() {
            tracing::warn!(
                "Dropped {} harvest rows without weather",
                report.missing_weather_count()
            );
        }
        if report.invalid_harvest_rows + report.duplicate_harvest_rows > 0 {
            tracing::warn!(
                "Dropped {} invalid and {} duplicate harvest rows",
                report.invalid_harvest_rows,
                report.duplicate_harvest_rows
            );
        }
        tracing::info!(
            "Merged {} of {} harvest rows",
            report.merged_rows,
            report.harvest_rows
        );

        (records, report)
    }
}

/// Valid weather keyed by date; the first valid row of a date wins.
pub(crate) fn weather_by_date<'a>(
    weather: &'a [WeatherObservation],
    report: &mut MergeReport,
) -> BTreeMap<NaiveDate, &'a WeatherObservation> {
    let mut by_date = BTreeMap::new();
    for day in weather {
        if let Err(reason) = validate_weather(day) {
            tracing::debug!("Dropping weather for {}: {}", day.date, reason);
            report.invalid_weather_rows += 1;
            continue;
        }
        if by_date.contains_key(&day.date) {
            report.duplicate_weather_rows += 1;
            continue;
        }
        by_date.insert(day.date, day);
    }
    by_date
}
