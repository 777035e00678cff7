//! Domain records for the Strawberry Capacity Forecasting pipeline

mod fraction;
mod harvest;
mod plant;
mod prediction;
mod weather;

pub use fraction::*;
pub use harvest::*;
pub use plant::*;
pub use prediction::*;
pub use weather::*;
