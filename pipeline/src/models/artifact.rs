//! The trained model artifact handed to the serving layer

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::HarvestFractionTable;
use uuid::Uuid;

use super::{FeatureImportance, FeatureSet, RegressionMetrics, VarietyEncoder};
use crate::error::{PipelineError, PipelineResult};
use crate::ml::FittedModel;

/// Name of the regression target stored in every artifact
pub const TARGET_NAME: &str = "kg_biological";

/// Selected model with everything inference needs to rebuild its inputs.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub model_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub algorithm: String,
    pub model: FittedModel,
    /// Ordered feature schema the model was fitted on
    pub feature_names: Vec<String>,
    pub variety_encoder: VarietyEncoder,
    pub fraction_table: HarvestFractionTable,
    pub capacity_metrics: RegressionMetrics,
    pub observed_metrics: RegressionMetrics,
    pub target: String,
    /// Sorted by descending importance
    pub feature_importances: Vec<FeatureImportance>,
    /// Last date of the training partition
    pub training_cutoff: NaiveDate,
}

impl TrainedModel {
    /// Fail when the artifact was fitted on a different feature layout than
    /// the one this build assembles.
    pub fn check_schema(&self) -> PipelineResult<()> {
        let found = FeatureSet::names();
        if self.feature_names != found || self.model.n_features() != FeatureSet::DIM {
            return Err(PipelineError::SchemaMismatch {
                expected: self.feature_names.clone(),
                found,
            });
        }
        Ok(())
    }

    pub fn predict_capacity(&self, features: &FeatureSet) -> f64 {
        self.model.predict(&features.to_vec())
    }

    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
