//! Shared record types for the Strawberry Capacity Forecasting pipeline
//!
//! This crate holds the plain tabular records exchanged between the
//! ingestion/serving layers and the modeling core.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
