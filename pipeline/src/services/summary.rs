//! Per-variety description of a capacity table, zero-harvest analysis included

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{CapacityRecord, CapacityTable, VarietyId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarietySummary {
    pub variety_id: VarietyId,
    pub rows: usize,
    /// Harvest years present, ascending
    pub years: Vec<i32>,
    pub mean_kg_observed: f64,
    pub total_kg_observed: f64,
    /// Mean of capacity / plants over picking days with plants
    pub mean_capacity_per_plant: Option<f64>,
    /// Zero-kg rows on picking days
    pub zero_harvests: usize,
    /// `zero_harvests` as a percentage of all rows
    pub zero_share_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_rows: usize,
    pub zero_harvests: usize,
    pub zero_share_pct: f64,
    pub varieties: Vec<VarietySummary>,
}

fn share_pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn is_zero_harvest(row: &CapacityRecord) -> bool {
    row.fraction > 0.0 && row.record.kg_observed == 0.0
}

pub fn summarize(table: &CapacityTable) -> DatasetSummary {
    let mut by_variety: BTreeMap<VarietyId, Vec<&CapacityRecord>> = BTreeMap::new();
    for row in &table.rows {
        by_variety.entry(row.record.variety_id).or_default().push(row);
    }

    let varieties: Vec<VarietySummary> = by_variety
        .into_iter()
        .map(|(variety_id, rows)| {
            let total_kg_observed: f64 = rows.iter().map(|r| r.record.kg_observed).sum();
            let mut years: Vec<i32> = rows.iter().map(|r| r.record.year).collect();
            years.sort_unstable();
            years.dedup();

            let per_plant: Vec<f64> = rows
                .iter()
                .filter(|r| r.record.plants_count > 0)
                .filter_map(|r| r.kg_biological.map(|kg| kg / f64::from(r.record.plants_count)))
                .collect();
            let mean_capacity_per_plant = (!per_plant.is_empty())
                .then(|| per_plant.iter().sum::<f64>() / per_plant.len() as f64);

            let zero_harvests = rows.iter().filter(|r| is_zero_harvest(r)).count();

            VarietySummary {
                variety_id,
                rows: rows.len(),
                years,
                mean_kg_observed: total_kg_observed / rows.len() as f64,
                total_kg_observed,
                mean_capacity_per_plant,
                zero_harvests,
                zero_share_pct: share_pct(zero_harvests, rows.len()),
            }
        })
        .collect();

    let zero_harvests = varieties.iter().map(|v| v.zero_harvests).sum();
    DatasetSummary {
        total_rows: table.len(),
        zero_harvests,
        zero_share_pct: share_pct(zero_harvests, table.len()),
        varieties,
    }
}
