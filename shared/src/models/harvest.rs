//! Harvest records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::VarietyId;

/// One day of picking for one variety, as recorded on the farm.
///
/// `kg_observed` is only the share of the crop picked that day; see
/// [`HarvestFractionTable`](super::HarvestFractionTable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct HarvestObservation {
    pub date: NaiveDate,
    pub variety_id: VarietyId,
    /// Ordinal day within the season
    pub day_number: i32,
    pub plants_count: u32,
    #[validate(range(min = 0.0))]
    pub kg_observed: f64,
    /// Season (harvest year) the record belongs to
    #[validate(range(min = 1900, max = 2200))]
    pub year: i32,
}
