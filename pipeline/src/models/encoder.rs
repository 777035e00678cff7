//! Stable categorical codes for varieties

use serde::{Deserialize, Serialize};
use shared::VarietyId;

use crate::error::{PipelineError, PipelineResult};

/// Maps each known variety to a code; codes follow ascending variety id.
///
/// Persisted inside the model artifact so inference reuses the training
/// mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarietyEncoder {
    varieties: Vec<VarietyId>,
}

impl VarietyEncoder {
    pub fn fit<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = VarietyId>,
    {
        let mut varieties: Vec<VarietyId> = ids.into_iter().collect();
        varieties.sort_unstable();
        varieties.dedup();
        Self { varieties }
    }

    pub fn code(&self, variety_id: VarietyId) -> PipelineResult<u32> {
        self.varieties
            .binary_search(&variety_id)
            .map(|idx| idx as u32)
            .map_err(|_| PipelineError::UnknownVariety(variety_id))
    }

    pub fn contains(&self, variety_id: VarietyId) -> bool {
        self.varieties.binary_search(&variety_id).is_ok()
    }

    pub fn varieties(&self) -> &[VarietyId] {
        &self.varieties
    }

    pub fn len(&self) -> usize {
        self.varieties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.varieties.is_empty()
    }
}
