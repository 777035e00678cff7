//! Pipeline data model
//!
//! Record types owned by the shared crate are re-exported here next to the
//! tables and artifacts the pipeline derives from them.

mod artifact;
mod encoder;
mod features;
mod metrics;
mod records;

pub use artifact::*;
pub use encoder::*;
pub use features::*;
pub use metrics::*;
pub use records::*;

pub use shared::{
    DateRange, HarvestFractionTable, HarvestObservation, PlantConfiguration, PredictionRequest,
    PredictionResult, VarietyId, WeatherObservation,
};
