//! Tessera TSDB - Tile aggregation engine for a distributed time-series database node
//!
//! This library implements the storage-layer downsampling path of a TSDB node:
//! - Block-aligned iteration over a source namespace's raw data
//! - Per-series bucketing with a pluggable aggregation policy
//! - Idempotent cold writes of aggregated "tiles" into a target namespace
//! - Deterministic processed-block accounting with partial-failure tolerance
//!
//! The aggregation entry point is [`tile::TileAggregator::aggregate_tiles`].
//! A thin query-boundary pass ([`query::apply_range_warnings`]) parses a query
//! expression and marks every range-selector window as verified on
//! caller-owned result metadata.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod namespace;
pub mod node;
pub mod types;

/// Prometheus metrics and telemetry
pub mod metrics;

/// Configuration management with TOML support
pub mod config;

/// Tile aggregation engine: orchestrator, block iterator, series scanner,
/// bucketing, and tile writer
pub mod tile;

/// Query expression parsing and the range-warning pass
pub mod query;

// Re-export main types
pub use error::{Error, ReadError, Result, ValidationError, WriteError};
pub use tile::{AggregateTilesOptions, AggregationRunResult, TileAggregator};
pub use types::{DataPoint, SeriesIdentity, TimeRange};
