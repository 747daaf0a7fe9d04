//! Series scanner
//!
//! Yields, per series present in a block, the ordered raw datapoints of
//! that series restricted to the intersection of the block interval and the
//! aggregation's requested range. The scanner is polymorphic over the kind
//! of raw source (buffered writes vs flushed segments); the core only
//! requires the ability to enumerate `(identity, ordered points)` pairs for
//! a time interval.

use std::sync::Arc;

use crate::error::ReadError;
use crate::namespace::NamespaceId;
use crate::node::{InMemoryNode, SourceTier};
use crate::types::{DataPoint, SeriesIdentity, TimeRange};

/// One series' raw datapoints within a block, ordered by timestamp
#[derive(Debug, Clone)]
pub struct SeriesBlockData {
    /// Stable series identity
    pub identity: SeriesIdentity,

    /// Ordered datapoints restricted to the scanned interval
    pub points: Vec<DataPoint>,
}

/// Capability to enumerate a block's series data per source tier
///
/// Implementations must return series in a stable (key) order and points in
/// timestamp order so aggregation runs are deterministic.
pub trait SeriesBlockScanner: Send + Sync {
    /// The source tiers this scanner reads, in scan order
    fn tiers(&self) -> &[SourceTier];

    /// Enumerate the series data of one tier within `range`
    fn scan_block(
        &self,
        namespace: &NamespaceId,
        tier: SourceTier,
        range: TimeRange,
    ) -> Result<Vec<SeriesBlockData>, ReadError>;
}

/// Scanner over an [`InMemoryNode`], reading the flushed tier first and the
/// buffered tier second
#[derive(Debug, Clone)]
pub struct NodeScanner {
    node: Arc<InMemoryNode>,
}

impl NodeScanner {
    /// Create a scanner over the given node
    pub fn new(node: Arc<InMemoryNode>) -> Self {
        Self { node }
    }
}

impl SeriesBlockScanner for NodeScanner {
    fn tiers(&self) -> &[SourceTier] {
        &SourceTier::ALL
    }

    fn scan_block(
        &self,
        namespace: &NamespaceId,
        tier: SourceTier,
        range: TimeRange,
    ) -> Result<Vec<SeriesBlockData>, ReadError> {
        let series = self.node.read_tier(namespace, tier, range)?;
        Ok(series
            .into_iter()
            .map(|(identity, points)| SeriesBlockData { identity, points })
            .collect())
    }
}
