//! Error handling for the capacity forecasting pipeline
//!
//! Every variant carries a stable machine code so the serving layer can map
//! failures without parsing messages.

use chrono::NaiveDate;
use shared::VarietyId;
use thiserror::Error;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    // Data errors
    #[error("No weather observation for {date} (needed by {variety_id})")]
    MissingWeather {
        date: NaiveDate,
        variety_id: VarietyId,
    },

    #[error("No harvest fraction for weekday index {weekday_index}")]
    InvalidFraction { weekday_index: usize },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // Modeling errors
    #[error("Training failed: {0}")]
    Training(String),

    #[error("Insufficient history for {variety_id} on {date}: {reason}")]
    InsufficientHistory {
        variety_id: VarietyId,
        date: NaiveDate,
        reason: String,
    },

    #[error("Unknown variety: {0}")]
    UnknownVariety(VarietyId),

    #[error("Feature schema mismatch: model expects {expected:?}, pipeline builds {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    // Plumbing errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Stable code for the failure kind
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::MissingWeather { .. } => "MISSING_WEATHER",
            PipelineError::InvalidFraction { .. } => "INVALID_FRACTION",
            PipelineError::InvalidRecord(_) => "INVALID_RECORD",
            PipelineError::Training(_) => "TRAINING_ERROR",
            PipelineError::InsufficientHistory { .. } => "INSUFFICIENT_HISTORY",
            PipelineError::UnknownVariety(_) => "UNKNOWN_VARIETY",
            PipelineError::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            PipelineError::Configuration(_) => "CONFIGURATION_ERROR",
            PipelineError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the failure only concerns one row or request, as opposed to
    /// the integrity of the whole run
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingWeather { .. }
                | PipelineError::InvalidRecord(_)
                | PipelineError::InsufficientHistory { .. }
                | PipelineError::UnknownVariety(_)
        )
    }
}

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
