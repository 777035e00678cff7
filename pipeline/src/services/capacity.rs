//! CapacityTransformer: inverts the weekday picking bias
//!
//! `kg_biological = kg_observed / fraction(weekday)`. Zero-fraction days
//! keep their row for history but get no capacity.

use chrono::NaiveDate;
use shared::HarvestFractionTable;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{CapacityRecord, CapacityTable, MergedRecord};

#[derive(Debug, Clone, Copy, Default)]
pub struct CapacityTransformer {
    fractions: HarvestFractionTable,
}

impl CapacityTransformer {
    pub fn new(fractions: HarvestFractionTable) -> Self {
        Self { fractions }
    }

    pub fn fractions(&self) -> &HarvestFractionTable {
        &self.fractions
    }

    pub fn fraction_for(&self, date: NaiveDate) -> PipelineResult<f64> {
        let weekday_index = HarvestFractionTable::weekday_index(date);
        self.fractions
            .fraction_at(weekday_index)
            .ok_or(PipelineError::InvalidFraction { weekday_index })
    }

    /// Capacity behind an observed yield, `None` on days without picking
    pub fn capacity(&self, date: NaiveDate, kg_observed: f64) -> PipelineResult<Option<f64>> {
        let fraction = self.fraction_for(date)?;
        Ok((fraction > 0.0).then(|| kg_observed / fraction))
    }

    /// Expected picked yield for a capacity
    pub fn observed(&self, date: NaiveDate, kg_biological: f64) -> PipelineResult<f64> {
        Ok(kg_biological * self.fraction_for(date)?)
    }

    pub fn transform_record(&self, record: MergedRecord) -> PipelineResult<CapacityRecord> {
        let fraction = self.fraction_for(record.date)?;
        let kg_biological = self.capacity(record.date, record.kg_observed)?;
        Ok(CapacityRecord {
            record,
            fraction,
            kg_biological,
        })
    }

    /// Transform a merged table; rows come out sorted by (variety, date).
    pub fn transform(&self, records: Vec<MergedRecord>) -> PipelineResult<CapacityTable> {
        let mut rows = records
            .into_iter()
            .map(|r| self.transform_record(r))
            .collect::<PipelineResult<Vec<_>>>()?;
        rows.sort_by_key(|r| (r.record.variety_id, r.record.date));

        let table = CapacityTable { rows };
        tracing::info!(
            "Capacity computed for {} rows, {} zero-fraction rows kept as history only",
            table.len() - table.excluded_count(),
            table.excluded_count()
        );
        Ok(table)
    }
}
