//! Tile aggregation engine
//!
//! Reads raw, high-resolution data from a source namespace over a bounded
//! half-open time range, aggregates it into coarser-resolution tiles
//! according to a fixed step, and persists the tiles into a target
//! namespace as cold writes.
//!
//! # Pipeline
//!
//! ```text
//! TileAggregator -> BlockIterator -> SeriesBlockScanner
//!                -> aggregate_series (bucketing + policy)
//!                -> TileWriter -> metrics
//! ```
//!
//! Blocks are processed in strict chronological order; within a block each
//! source tier (flushed, then buffered) is scanned once and counts as one
//! block-level attempt toward the processed-block count. Series tile
//! computation inside a block may run on a bounded worker pool; writes are
//! issued sequentially in series-key order so runs stay deterministic and
//! writes for one series+timestamp are never reordered.

pub mod blocks;
pub mod bucket;
pub mod options;
pub mod scan;
pub mod writer;

pub use blocks::BlockIterator;
pub use bucket::{aggregate_series, AggregationPolicy};
pub use options::{AggregateTilesOptions, ReadFailurePolicy};
pub use scan::{NodeScanner, SeriesBlockData, SeriesBlockScanner};
pub use writer::{NodeTileWriter, TileWriter};

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::AggregationConfig;
use crate::error::{Error, Result, ValidationError};
use crate::metrics;
use crate::namespace::{NamespaceId, NamespaceRegistry};
use crate::types::{DataPoint, SeriesIdentity};

// ============================================================================
// Run Context
// ============================================================================

/// Caller-supplied cancellation and deadline context for one run
///
/// Cancellation is checked at block boundaries; a cancelled run returns the
/// block-level attempts completed so far as a resumable watermark.
#[derive(Debug, Clone)]
pub struct AggregationContext {
    start_time: Instant,
    deadline: Option<Duration>,
    cancelled: Arc<AtomicBool>,
}

impl AggregationContext {
    /// Create a context with no deadline
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a context that expires after `deadline`
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::new()
        }
    }

    /// Request cancellation; takes effect at the next checkpoint
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the deadline has passed
    pub fn is_timed_out(&self) -> bool {
        match self.deadline {
            Some(d) => self.start_time.elapsed() > d,
            None => false,
        }
    }

    /// Whether the run should stop at the next checkpoint
    pub fn should_stop(&self) -> bool {
        self.is_cancelled() || self.is_timed_out()
    }
}

impl Default for AggregationContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Run-scoped counters, updated with atomic increments
///
/// Accumulates across runs of one aggregator; see
/// [`RunStats::snapshot`] for a point-in-time copy.
#[derive(Debug, Default)]
pub struct RunStats {
    /// Block-level scan attempts completed
    pub blocks_processed: AtomicU64,

    /// Series aggregated
    pub series_processed: AtomicU64,

    /// Raw datapoints read
    pub points_read: AtomicU64,

    /// Tiles successfully written
    pub tiles_written: AtomicU64,

    /// Tile writes that failed
    pub write_errors: AtomicU64,
}

impl RunStats {
    /// Get a snapshot of current statistics
    pub fn snapshot(&self) -> RunStatsSnapshot {
        RunStatsSnapshot {
            blocks_processed: self.blocks_processed.load(Ordering::Relaxed),
            series_processed: self.series_processed.load(Ordering::Relaxed),
            points_read: self.points_read.load(Ordering::Relaxed),
            tiles_written: self.tiles_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of aggregation statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatsSnapshot {
    /// Block-level scan attempts completed
    pub blocks_processed: u64,
    /// Series aggregated
    pub series_processed: u64,
    /// Raw datapoints read
    pub points_read: u64,
    /// Tiles successfully written
    pub tiles_written: u64,
    /// Tile writes that failed
    pub write_errors: u64,
}

/// Outcome of one aggregation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationRunResult {
    /// Block-level scan attempts completed; equals the number of source
    /// blocks intersecting the requested range times the number of source
    /// tiers, independent of per-series outcomes
    pub processed_block_count: i64,

    /// Tile writes that failed during the run; failures never abort the run
    pub write_error_count: u64,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Top-level tile aggregation entry point
///
/// Generic over the series scanner and tile writer so the core works
/// against any raw source and target storage.
pub struct TileAggregator<S: SeriesBlockScanner, W: TileWriter> {
    registry: Arc<NamespaceRegistry>,
    scanner: S,
    writer: W,
    policy: AggregationPolicy,
    on_read_error: ReadFailurePolicy,
    pool: Option<rayon::ThreadPool>,
    stats: RunStats,
}

impl<S: SeriesBlockScanner, W: TileWriter> TileAggregator<S, W> {
    /// Create an aggregator with the default last-value policy, abort-on-read-failure,
    /// and sequential series processing
    pub fn new(registry: Arc<NamespaceRegistry>, scanner: S, writer: W) -> Self {
        Self {
            registry,
            scanner,
            writer,
            policy: AggregationPolicy::default(),
            on_read_error: ReadFailurePolicy::default(),
            pool: None,
            stats: RunStats::default(),
        }
    }

    /// Set the aggregation policy
    pub fn with_policy(mut self, policy: AggregationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the block read failure policy
    pub fn with_read_failure_policy(mut self, policy: ReadFailurePolicy) -> Self {
        self.on_read_error = policy;
        self
    }

    /// Bound per-block series parallelism to `worker_count` workers
    ///
    /// A count of 0 or 1 keeps series processing sequential.
    pub fn with_worker_count(mut self, worker_count: usize) -> Result<Self> {
        self.pool = if worker_count > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(worker_count)
                    .build()
                    .map_err(|e| Error::Configuration(e.to_string()))?,
            )
        } else {
            None
        };
        Ok(self)
    }

    /// Apply an [`AggregationConfig`]
    pub fn with_config(self, config: &AggregationConfig) -> Result<Self> {
        self.with_policy(config.policy)
            .with_read_failure_policy(config.on_read_error)
            .with_worker_count(config.worker_count)
    }

    /// Statistics accumulated across runs of this aggregator
    pub fn stats(&self) -> RunStatsSnapshot {
        self.stats.snapshot()
    }

    /// Aggregate raw data from `source` into tiles in `target`
    ///
    /// Validates options and resolves both namespaces before any work; a
    /// validation failure touches neither storage nor counters. The run is
    /// idempotent: re-invoking with identical arguments against an
    /// unchanged source leaves the target in the same state.
    pub fn aggregate_tiles(
        &self,
        ctx: &AggregationContext,
        source: &NamespaceId,
        target: &NamespaceId,
        options: &AggregateTilesOptions,
    ) -> Result<AggregationRunResult> {
        let source_meta = self.registry.resolve(source)?;
        let target_meta = self.registry.resolve(target)?;
        if !target_meta.cold_writes_enabled {
            return Err(ValidationError::ColdWritesDisabled(target.to_string()).into());
        }

        let run_start = Instant::now();
        tracing::info!(
            source = %source,
            target = %target,
            start = options.range.start,
            end = options.range.end,
            step_ms = options.step_ms,
            policy = self.policy.name(),
            "starting tile aggregation"
        );

        let mut processed: i64 = 0;
        let mut write_errors: u64 = 0;

        for block in BlockIterator::new(options.range, source_meta.retention.block_size_ms) {
            let Some(clip) = block.intersect(&options.range) else {
                continue;
            };

            for &tier in self.scanner.tiers() {
                if ctx.should_stop() {
                    tracing::warn!(processed_blocks = processed, "aggregation cancelled");
                    return Err(Error::Cancelled {
                        processed_blocks: processed,
                    });
                }

                match self.scanner.scan_block(source, tier, clip) {
                    Ok(series) => {
                        write_errors +=
                            self.aggregate_block(target, &series, options)?;
                    }
                    Err(e) => match self.on_read_error {
                        ReadFailurePolicy::Abort => return Err(e.into()),
                        ReadFailurePolicy::SkipBlock => {
                            tracing::warn!(
                                tier = %tier,
                                block_start = block.start,
                                error = %e,
                                "skipping unreadable block"
                            );
                        }
                    },
                }

                processed += 1;
                self.stats.blocks_processed.fetch_add(1, Ordering::Relaxed);
            }
        }

        tracing::info!(
            processed_blocks = processed,
            write_errors,
            elapsed_ms = run_start.elapsed().as_millis() as u64,
            "finished tile aggregation"
        );
        Ok(AggregationRunResult {
            processed_block_count: processed,
            write_error_count: write_errors,
        })
    }

    /// Bucket and write one block's series; returns the number of failed
    /// tile writes
    fn aggregate_block(
        &self,
        target: &NamespaceId,
        series: &[SeriesBlockData],
        options: &AggregateTilesOptions,
    ) -> Result<u64> {
        let step_ms = options.step_ms;
        let policy = self.policy;

        // Pure computation may fan out; writes below stay sequential and
        // ordered by series key.
        let compute = |s: &SeriesBlockData| -> (SeriesIdentity, usize, Vec<DataPoint>) {
            let tiles = aggregate_series(&s.points, step_ms, policy);
            (s.identity.clone(), s.points.len(), tiles)
        };
        let tiled: Vec<(SeriesIdentity, usize, Vec<DataPoint>)> = match &self.pool {
            Some(pool) => pool.install(|| series.par_iter().map(compute).collect()),
            None => series.iter().map(compute).collect(),
        };

        let mut write_errors = 0;
        for (identity, point_count, tiles) in tiled {
            self.stats.series_processed.fetch_add(1, Ordering::Relaxed);
            self.stats
                .points_read
                .fetch_add(point_count as u64, Ordering::Relaxed);

            for tile in tiles {
                match self
                    .writer
                    .write_tile(target, &identity, &tile, options.insert_only)
                {
                    Ok(()) => {
                        self.stats.tiles_written.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        write_errors += 1;
                        self.stats.write_errors.fetch_add(1, Ordering::Relaxed);
                        metrics::record_write_agg_error();
                        tracing::warn!(
                            series = %identity,
                            timestamp = tile.timestamp,
                            error = %e,
                            "tile write failed, continuing"
                        );
                    }
                }
            }
        }
        Ok(write_errors)
    }
}
