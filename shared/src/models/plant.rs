//! Plant configuration records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::VarietyId;

/// Number of plants of a variety in the ground over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantConfiguration {
    pub variety_id: VarietyId,
    pub start_date: NaiveDate,
    /// `None` means the configuration is still current
    pub end_date: Option<NaiveDate>,
    pub plants_count: u32,
}

impl PlantConfiguration {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.map_or(true, |end| end >= date)
    }
}

/// Plants of `variety_id` active on `date`, zero when no configuration applies.
///
/// The first matching configuration wins.
pub fn plants_on(configs: &[PlantConfiguration], variety_id: VarietyId, date: NaiveDate) -> u32 {
    configs
        .iter()
        .find(|c| c.variety_id == variety_id && c.is_active_on(date))
        .map(|c| c.plants_count)
        .unwrap_or(0)
}
