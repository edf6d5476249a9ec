use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::DropReason;

/// Where the rows of an ETL run came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    #[default]
    Source,
    /// Built-in development rows, substituted because the source was unreadable.
    Sample,
}

/// Bookkeeping for one ETL run. Flat so it can be appended to a CSV ledger.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtlReport {
    pub run_at: DateTime<Utc>,
    pub input: String,
    pub output: String,
    pub origin: DataOrigin,

    pub rows_read: usize,

    // drops by cleaning step
    pub dropped_unparseable_time: usize,
    pub dropped_out_of_range: usize,
    pub dropped_missing_coordinates: usize,
    pub dropped_sentinel_coordinates: usize,

    pub rows_written: usize,
}

impl EtlReport {
    pub fn new(input: &str, output: &str, origin: DataOrigin) -> Self {
        EtlReport {
            run_at: Utc::now(),
            input: input.to_string(),
            output: output.to_string(),
            origin,
            ..Default::default()
        }
    }

    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::UnparseableStartTime => self.dropped_unparseable_time += 1,
            DropReason::OutOfRange { .. } => self.dropped_out_of_range += 1,
            DropReason::MissingCoordinates => self.dropped_missing_coordinates += 1,
            DropReason::SentinelCoordinates => self.dropped_sentinel_coordinates += 1,
        }
    }

    pub fn dropped(&self) -> usize {
        self.dropped_unparseable_time
            + self.dropped_out_of_range
            + self.dropped_missing_coordinates
            + self.dropped_sentinel_coordinates
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn retained_pct(&self) -> f64 {
        Self::pct(self.rows_written, self.rows_read)
    }
}
