//! Pipeline stages and the services built on them

pub mod backtest;
pub mod capacity;
pub mod evaluation;
pub mod features;
pub mod merge;
pub mod pipeline;
pub mod prediction;
pub mod split;
pub mod summary;
pub mod training;

pub use backtest::{backtest, BacktestReport, Calibration};
pub use capacity::CapacityTransformer;
pub use evaluation::{CandidateReport, Evaluation, Evaluator};
pub use features::{FeatureEngineer, SeasonState};
pub use merge::Merger;
pub use pipeline::{TrainingOutcome, TrainingPipeline};
pub use prediction::{HistorySource, InMemoryHistory, Predictor};
pub use split::{DataSplit, Splitter};
pub use summary::{summarize, DatasetSummary};
pub use training::{ModelTrainer, TrainedCandidate};
