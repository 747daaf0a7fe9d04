//! In-memory storage node
//!
//! Models the narrow storage surface the aggregation core and its harness
//! depend on: tagged ingestion writes into a buffered tier, a flush that
//! moves buffered data into the flushed tier, cold writes that may target
//! any retention-covered time in the past, and a merged fetch.
//!
//! Data lives in two tiers per namespace:
//! - **buffered**: recent writes not yet flushed (in-memory in a real node)
//! - **flushed**: data already flushed to segments (on-disk in a real node)
//!
//! Cold writes land directly in the flushed tier with last-write-wins
//! semantics per `(series, timestamp)`, which makes re-aggregation
//! idempotent.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{ReadError, WriteError};
use crate::metrics;
use crate::namespace::{NamespaceId, NamespaceRegistry};
use crate::types::{DataPoint, SeriesIdentity, TagSet, TimeRange, TimeUnit};

/// The kind of raw source a scan reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTier {
    /// Data already flushed to segments
    Flushed,
    /// Buffered writes not yet flushed
    Buffered,
}

impl SourceTier {
    /// All tiers in scan order: flushed first, then buffered, so that the
    /// most recently ingested data is written last and wins at the target
    pub const ALL: [SourceTier; 2] = [SourceTier::Flushed, SourceTier::Buffered];
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTier::Flushed => write!(f, "flushed"),
            SourceTier::Buffered => write!(f, "buffered"),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredPoint {
    value: f64,
    unit: TimeUnit,
    annotation: Option<Bytes>,
}

#[derive(Debug, Clone, Default)]
struct StoredSeries {
    tags: TagSet,
    points: BTreeMap<i64, StoredPoint>,
}

#[derive(Debug, Default)]
struct NamespaceData {
    buffered: HashMap<String, StoredSeries>,
    flushed: HashMap<String, StoredSeries>,
}

impl NamespaceData {
    fn tier(&self, tier: SourceTier) -> &HashMap<String, StoredSeries> {
        match tier {
            SourceTier::Flushed => &self.flushed,
            SourceTier::Buffered => &self.buffered,
        }
    }
}

/// In-memory storage node holding per-namespace series data
#[derive(Debug)]
pub struct InMemoryNode {
    registry: Arc<NamespaceRegistry>,
    data: RwLock<HashMap<NamespaceId, NamespaceData>>,
}

impl InMemoryNode {
    /// Create a node backed by the given namespace registry
    pub fn new(registry: Arc<NamespaceRegistry>) -> Self {
        Self {
            registry,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// The registry this node validates namespaces against
    pub fn registry(&self) -> &Arc<NamespaceRegistry> {
        &self.registry
    }

    /// Ordinary tagged ingestion write into the buffered tier
    #[allow(clippy::too_many_arguments)]
    pub fn write_tagged(
        &self,
        namespace: &NamespaceId,
        series_key: &str,
        tags: TagSet,
        timestamp: i64,
        value: f64,
        unit: TimeUnit,
        annotation: Option<Bytes>,
    ) -> Result<(), WriteError> {
        if !self.registry.contains(namespace) {
            return Err(WriteError::NamespaceNotFound(namespace.to_string()));
        }

        let mut data = self.data.write();
        let ns = data.entry(namespace.clone()).or_default();
        let series = ns.buffered.entry(series_key.to_string()).or_default();
        if series.tags.is_empty() {
            series.tags = tags;
        }
        series.points.insert(
            timestamp,
            StoredPoint {
                value,
                unit,
                annotation,
            },
        );
        Ok(())
    }

    /// Cold write into the flushed tier
    ///
    /// Permitted to target any retention-covered time in the past, bypassing
    /// real-time ingestion ordering. Last-write-wins per
    /// `(series, timestamp)`; with `insert_only` an existing entry is kept
    /// untouched.
    pub fn cold_write(
        &self,
        namespace: &NamespaceId,
        identity: &SeriesIdentity,
        point: &DataPoint,
        insert_only: bool,
    ) -> Result<(), WriteError> {
        if !self.registry.contains(namespace) {
            return Err(WriteError::NamespaceNotFound(namespace.to_string()));
        }

        let mut data = self.data.write();
        let ns = data.entry(namespace.clone()).or_default();
        let series = ns.flushed.entry(identity.key.clone()).or_default();
        if series.tags.is_empty() {
            series.tags = identity.tags.clone();
        }

        if insert_only && series.points.contains_key(&point.timestamp) {
            return Ok(());
        }
        series.points.insert(
            point.timestamp,
            StoredPoint {
                value: point.value,
                unit: point.unit,
                annotation: point.annotation.clone(),
            },
        );
        Ok(())
    }

    /// Fetch the merged (flushed then buffered) datapoints of one series
    /// within a half-open range, ordered by timestamp
    ///
    /// On a timestamp collision across tiers the buffered point wins, being
    /// the most recently ingested.
    pub fn fetch(
        &self,
        namespace: &NamespaceId,
        series_key: &str,
        range: TimeRange,
    ) -> Result<Vec<DataPoint>, ReadError> {
        let data = self.data.read();
        let Some(ns) = data.get(namespace) else {
            if self.registry.contains(namespace) {
                return Ok(Vec::new());
            }
            return Err(ReadError::NamespaceNotFound(namespace.to_string()));
        };

        let mut merged: BTreeMap<i64, DataPoint> = BTreeMap::new();
        for tier in SourceTier::ALL {
            if let Some(series) = ns.tier(tier).get(series_key) {
                for (&ts, stored) in series.points.range(range.start..range.end) {
                    merged.insert(ts, to_data_point(ts, stored));
                }
            }
        }
        Ok(merged.into_values().collect())
    }

    /// Read every series of one tier that has data in the given half-open
    /// range
    ///
    /// Series are returned in key order and points in timestamp order, so
    /// repeated scans of unchanged data are deterministic.
    pub fn read_tier(
        &self,
        namespace: &NamespaceId,
        tier: SourceTier,
        range: TimeRange,
    ) -> Result<Vec<(SeriesIdentity, Vec<DataPoint>)>, ReadError> {
        let data = self.data.read();
        let Some(ns) = data.get(namespace) else {
            if self.registry.contains(namespace) {
                return Ok(Vec::new());
            }
            return Err(ReadError::NamespaceNotFound(namespace.to_string()));
        };

        let mut keys: Vec<&String> = ns.tier(tier).keys().collect();
        keys.sort();

        let mut result = Vec::new();
        for key in keys {
            let series = &ns.tier(tier)[key];
            let points: Vec<DataPoint> = series
                .points
                .range(range.start..range.end)
                .map(|(&ts, stored)| to_data_point(ts, stored))
                .collect();
            if !points.is_empty() {
                result.push((SeriesIdentity::new(key, series.tags.clone()), points));
            }
        }
        Ok(result)
    }

    /// Move all buffered data of a namespace into the flushed tier
    ///
    /// Returns the number of points flushed. Buffered points win over
    /// existing flushed points at the same timestamp.
    pub fn flush(&self, namespace: &NamespaceId) -> Result<usize, ReadError> {
        let mut data = self.data.write();
        let ns = data
            .get_mut(namespace)
            .ok_or_else(|| ReadError::NamespaceNotFound(namespace.to_string()))?;

        let mut flushed_points = 0;
        for (key, buffered) in ns.buffered.drain() {
            let target = ns.flushed.entry(key).or_default();
            if target.tags.is_empty() {
                target.tags = buffered.tags;
            }
            flushed_points += buffered.points.len();
            target.points.extend(buffered.points);
        }

        metrics::record_flush_index_success();
        tracing::debug!(namespace = %namespace, points = flushed_points, "flushed buffered data");
        Ok(flushed_points)
    }
}

fn to_data_point(timestamp: i64, stored: &StoredPoint) -> DataPoint {
    DataPoint {
        timestamp,
        value: stored.value,
        unit: stored.unit,
        annotation: stored.annotation.clone(),
    }
}
