//! Capacity transform integration tests
//!
//! - Inverse round trip: capacity * fraction == observed on picking days
//! - Zero-fraction days never become modeling rows

mod common;

use chrono::{Datelike, Duration, Weekday};
use proptest::prelude::*;

use common::{date, weather_on};
use strawberry_capacity_pipeline::models::{
    HarvestFractionTable, HarvestObservation, VarietyEncoder, VarietyId,
};
use strawberry_capacity_pipeline::services::{CapacityTransformer, FeatureEngineer, Merger};

fn harvest(on: chrono::NaiveDate, kg: f64) -> HarvestObservation {
    HarvestObservation {
        date: on,
        variety_id: VarietyId(1),
        day_number: 1,
        plants_count: 5000,
        kg_observed: kg,
        year: on.year(),
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn thursday_300_kg_is_600_kg_capacity() {
    let thursday = date(2025, 4, 17);
    assert_eq!(thursday.weekday(), Weekday::Thu);

    let transformer = CapacityTransformer::default();
    assert_eq!(transformer.capacity(thursday, 300.0).unwrap(), Some(600.0));
}

#[test]
fn sunday_harvest_is_absent_from_modeling_rows() {
    let saturday = date(2025, 4, 19);
    let sunday = date(2025, 4, 20);
    let monday = date(2025, 4, 21);
    let harvests = vec![harvest(saturday, 80.0), harvest(sunday, 100.0), harvest(monday, 60.0)];
    let weather = vec![weather_on(saturday, 15.0), weather_on(sunday, 16.0), weather_on(monday, 17.0)];

    let (merged, report) = Merger::new().merge(&harvests, &weather);
    assert_eq!(report.missing_weather_count(), 0);
    assert_eq!(merged.len(), 3);

    let table = CapacityTransformer::default().transform(merged).unwrap();
    assert_eq!(table.excluded_count(), 1);

    let engineered = FeatureEngineer::new(VarietyEncoder::fit([VarietyId(1)]))
        .engineer(&table, &weather)
        .unwrap();
    assert_eq!(engineered.len(), 2);
    assert!(engineered.iter().all(|r| r.date != sunday));

    // Sunday weather still feeds Monday's windows
    let monday_row = engineered.iter().find(|r| r.date == monday).unwrap();
    assert_eq!(monday_row.features.temp_mean_7d, 16.0);
    assert_eq!(monday_row.features.capacity_prev_day, Some(160.0));
}

// ============================================================================
// Property Tests
// ============================================================================

fn picking_day_strategy() -> impl Strategy<Value = chrono::NaiveDate> {
    (0i64..730)
        .prop_map(|offset| date(2024, 1, 1) + Duration::days(offset))
        .prop_filter("not a Sunday", |d| d.weekday() != Weekday::Sun)
}

fn schedule_strategy() -> impl Strategy<Value = HarvestFractionTable> {
    prop::array::uniform7(0.05f64..=1.0).prop_map(|f| HarvestFractionTable::new(f).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// capacity * fraction recovers the observed yield on picking days
    #[test]
    fn prop_inverse_round_trip(day in picking_day_strategy(), kg in 0.0f64..5000.0) {
        let transformer = CapacityTransformer::default();
        let capacity = transformer.capacity(day, kg).unwrap().unwrap();
        let fraction = transformer.fraction_for(day).unwrap();
        prop_assert!((capacity * fraction - kg).abs() <= 1e-9 * kg.max(1.0));
    }

    /// Same property under any injected schedule without zero days
    #[test]
    fn prop_round_trip_any_schedule(
        schedule in schedule_strategy(),
        offset in 0i64..365,
        kg in 0.0f64..5000.0,
    ) {
        let day = date(2024, 1, 1) + Duration::days(offset);
        let transformer = CapacityTransformer::new(schedule);
        let capacity = transformer.capacity(day, kg).unwrap().unwrap();
        let observed = transformer.observed(day, capacity).unwrap();
        prop_assert!((observed - kg).abs() <= 1e-9 * kg.max(1.0));
    }

    /// Sundays under the default schedule never get a capacity
    #[test]
    fn prop_sunday_has_no_capacity(week in 0i64..104, kg in 0.0f64..5000.0) {
        let sunday = date(2024, 1, 7) + Duration::weeks(week);
        prop_assert_eq!(CapacityTransformer::default().capacity(sunday, kg).unwrap(), None);
    }
}
