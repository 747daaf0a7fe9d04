//! Options for a tile aggregation run

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::TimeRange;

/// Options for one `aggregate_tiles` invocation
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateTilesOptions {
    /// Half-open time range to aggregate, `[start, end)`
    pub range: TimeRange,

    /// Bucket width used to downsample raw data, milliseconds
    pub step_ms: i64,

    /// If set, existing tiles at the target are kept rather than overwritten
    pub insert_only: bool,
}

impl AggregateTilesOptions {
    /// Create and validate aggregation options
    ///
    /// Fails with a [`ValidationError`] when `start >= end` or `step <= 0`,
    /// without touching storage or counters.
    pub fn new(
        start: i64,
        end: i64,
        step_ms: i64,
        insert_only: bool,
    ) -> Result<Self, ValidationError> {
        if step_ms <= 0 {
            return Err(ValidationError::InvalidStep { step_ms });
        }
        let range = TimeRange::new(start, end)?;
        Ok(Self {
            range,
            step_ms,
            insert_only,
        })
    }
}

/// Policy for a block read failure mid-run
///
/// The reference behavior aborts the run, since aggregation correctness for
/// a block depends on seeing its complete raw dataset. `SkipBlock` trades
/// that guarantee for forward progress on large jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadFailurePolicy {
    /// Abort the run on the first block read failure
    #[default]
    Abort,

    /// Log the failure, count the attempt, and continue with the next block
    SkipBlock,
}
