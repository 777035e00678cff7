//! Strawberry biological-capacity forecasting
//!
//! Recovers the yield every plant would give on a day from fraction-biased
//! harvest records, learns it from weather and prior capacity, and turns
//! forecasts back into expected picked yield.

pub mod config;
pub mod error;
pub mod ml;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{PipelineError, PipelineResult};
