//! Splitter: strict temporal train/test partition

use chrono::NaiveDate;

use crate::error::{PipelineError, PipelineResult};
use crate::models::EngineeredRecord;

/// Train and test partitions; every test date is later than every train date.
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub train: Vec<EngineeredRecord>,
    pub test: Vec<EngineeredRecord>,
    /// Last date in the training partition
    pub cutoff: NaiveDate,
}

#[derive(Debug, Clone, Copy)]
pub struct Splitter {
    train_ratio: f64,
}

impl Splitter {
    pub fn new(train_ratio: f64) -> Self {
        Self { train_ratio }
    }

    /// Order rows by (date, variety) and cut at `floor(n * ratio)`, kept
    /// within `1..n`.
    ///
    /// The cut never separates rows sharing a date: it moves forward to the
    /// next date boundary, or backward when moving forward would leave the
    /// test partition empty.
    pub fn split(&self, mut records: Vec<EngineeredRecord>) -> PipelineResult<DataSplit> {
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(PipelineError::Training(format!(
                "train ratio must be strictly between 0 and 1, got {}",
                self.train_ratio
            )));
        }
        records.sort_by_key(|r| (r.date, r.variety_id));

        let n = records.len();
        if n < 2 {
            return Err(PipelineError::Training(format!(
                "cannot split {n} rows into non-empty train and test partitions"
            )));
        }
        let mut cut = ((n as f64 * self.train_ratio).floor() as usize).clamp(1, n - 1);

        let boundary = |idx: usize| idx == 0 || idx == n || records[idx - 1].date != records[idx].date;
        let mut forward = cut;
        while !boundary(forward) {
            forward += 1;
        }
        if forward < n {
            cut = forward;
        } else {
            while !boundary(cut) {
                cut -= 1;
            }
        }

        if cut == 0 || cut == n {
            return Err(PipelineError::Training(format!(
                "all {n} rows share one date, no temporal cut exists"
            )));
        }

        let test = records.split_off(cut);
        let cutoff = records[cut - 1].date;
        tracing::info!(
            "Temporal split: {} train rows up to {}, {} test rows",
            records.len(),
            cutoff,
            test.len()
        );

        Ok(DataSplit {
            train: records,
            test,
            cutoff,
        })
    }
}
