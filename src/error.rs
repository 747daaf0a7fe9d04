//! Error types for the tile aggregation engine

use thiserror::Error;

/// Main error type for aggregation runs
#[derive(Error, Debug)]
pub enum Error {
    /// Options or namespace validation failed before any work was done
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Failure enumerating a block's raw series data
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    /// Run was cancelled or its deadline expired; carries the number of
    /// block-level attempts completed before stopping, as a resumable
    /// watermark
    #[error("Aggregation cancelled after {processed_blocks} processed blocks")]
    Cancelled {
        /// Block-level attempts completed before cancellation
        processed_blocks: i64,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation errors
///
/// Fatal to a run; no partial work is performed and no counters move.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Time range is empty or inverted
    #[error("Invalid time range: start {start} must be before end {end}")]
    InvalidTimeRange {
        /// Start timestamp (inclusive), milliseconds
        start: i64,
        /// End timestamp (exclusive), milliseconds
        end: i64,
    },

    /// Aggregation step must be positive
    #[error("Invalid step: {step_ms}ms (must be > 0)")]
    InvalidStep {
        /// The rejected step, milliseconds
        step_ms: i64,
    },

    /// Namespace identifier did not resolve in the registry
    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    /// Target namespace does not accept cold writes
    #[error("Cold writes disabled for namespace: {0}")]
    ColdWritesDisabled(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    Failed(String),
}

/// Read errors
///
/// Raised while enumerating a block's raw series data. Whether a read
/// failure aborts the whole run is controlled by
/// [`crate::tile::ReadFailurePolicy`].
#[derive(Error, Debug, Clone)]
pub enum ReadError {
    /// Scanning a block's series data failed
    #[error("Block scan failed for namespace {namespace} at block start {block_start}: {message}")]
    BlockScan {
        /// Source namespace identifier
        namespace: String,
        /// Start of the failing block, milliseconds
        block_start: i64,
        /// Backend-specific failure description
        message: String,
    },

    /// Namespace data disappeared mid-run
    #[error("Namespace not found during scan: {0}")]
    NamespaceNotFound(String),
}

/// Write errors
///
/// Raised persisting an individual tile. Recoverable: the orchestrator
/// records the failure and continues with the next series/bucket.
#[derive(Error, Debug, Clone)]
pub enum WriteError {
    /// Target storage rejected the tile
    #[error("Target rejected tile for series {series} at {timestamp}: {message}")]
    TargetRejected {
        /// Series key
        series: String,
        /// Tile timestamp, milliseconds
        timestamp: i64,
        /// Backend-specific rejection description
        message: String,
    },

    /// Target namespace data disappeared mid-run
    #[error("Namespace not found during write: {0}")]
    NamespaceNotFound(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
