//! Prometheus metrics and telemetry for the tile aggregation engine
//!
//! Process-wide counters incremented as side effects of the aggregation
//! path. Per-run accounting lives in [`crate::tile::RunStats`]; these
//! counters are cumulative across all runs.

use lazy_static::lazy_static;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

lazy_static! {
    /// Successful cold (tile) writes into a target namespace
    pub static ref COLD_WRITES_TOTAL: IntCounter = register_int_counter!(
        "tsdb_cold_writes_total",
        "Total successful cold writes of aggregated tiles"
    ).unwrap();

    /// Failed tile writes
    pub static ref WRITE_AGG_DATA_ERRORS_TOTAL: IntCounter = register_int_counter!(
        "tsdb_write_agg_data_errors_total",
        "Total failed aggregated-data writes"
    ).unwrap();

    /// Tiles written via the aggregation path, distinct from ordinary ingestion
    pub static ref LARGE_TILE_WRITES_TOTAL: IntCounter = register_int_counter!(
        "tsdb_large_tile_writes_total",
        "Total large-tile writes performed by the aggregation path"
    ).unwrap();

    /// Index flush completions (owned by the flush subsystem, not aggregation)
    pub static ref FLUSH_INDEX_SUCCESS_TOTAL: IntCounter = register_int_counter!(
        "tsdb_flush_index_success_total",
        "Total successful index flushes"
    ).unwrap();
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Record a successful cold (tile) write
#[inline]
pub fn record_cold_write() {
    COLD_WRITES_TOTAL.inc();
}

/// Record a failed tile write
#[inline]
pub fn record_write_agg_error() {
    WRITE_AGG_DATA_ERRORS_TOTAL.inc();
}

/// Record a tile written through the aggregation path
#[inline]
pub fn record_large_tile_write() {
    LARGE_TILE_WRITES_TOTAL.inc();
}

/// Record a successful index flush
#[inline]
pub fn record_flush_index_success() {
    FLUSH_INDEX_SUCCESS_TOTAL.inc();
}
