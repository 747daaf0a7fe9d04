//! Tile writer
//!
//! Persists aggregated tiles into the target namespace as cold writes and
//! records the write-side counters. A failed write is returned to the
//! orchestrator, which counts it and continues with the next series/bucket.

use std::sync::Arc;

use crate::error::WriteError;
use crate::metrics;
use crate::namespace::NamespaceId;
use crate::node::InMemoryNode;
use crate::types::{DataPoint, SeriesIdentity};

/// Capability to persist one tile into a target namespace
pub trait TileWriter: Send + Sync {
    /// Write one aggregated tile as a cold write
    fn write_tile(
        &self,
        namespace: &NamespaceId,
        identity: &SeriesIdentity,
        tile: &DataPoint,
        insert_only: bool,
    ) -> Result<(), WriteError>;
}

/// Tile writer over an [`InMemoryNode`]
///
/// On success increments the cold-write and large-tile-write counters.
/// Cold writes are idempotent at the node: writing the same
/// `(series, timestamp, value)` twice leaves the same stored state.
#[derive(Debug, Clone)]
pub struct NodeTileWriter {
    node: Arc<InMemoryNode>,
}

impl NodeTileWriter {
    /// Create a writer over the given node
    pub fn new(node: Arc<InMemoryNode>) -> Self {
        Self { node }
    }
}

impl TileWriter for NodeTileWriter {
    fn write_tile(
        &self,
        namespace: &NamespaceId,
        identity: &SeriesIdentity,
        tile: &DataPoint,
        insert_only: bool,
    ) -> Result<(), WriteError> {
        self.node.cold_write(namespace, identity, tile, insert_only)?;
        metrics::record_cold_write();
        metrics::record_large_tile_write();
        tracing::trace!(
            namespace = %namespace,
            series = %identity,
            timestamp = tile.timestamp,
            "wrote tile"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::{NamespaceMetadata, NamespaceRegistry, RetentionOptions};
    use crate::types::{TagSet, TimeRange};

    const HOUR_MS: i64 = 3_600_000;

    fn writer_and_node() -> (NodeTileWriter, Arc<InMemoryNode>, NamespaceId) {
        let registry = Arc::new(NamespaceRegistry::new());
        let ns = NamespaceId::new("agg");
        registry.register(NamespaceMetadata::new(
            ns.clone(),
            RetentionOptions::new(6 * HOUR_MS, 152 * HOUR_MS).unwrap(),
        ));
        let node = Arc::new(InMemoryNode::new(registry));
        (NodeTileWriter::new(node.clone()), node, ns)
    }

    #[test]
    fn test_write_tile_persists_and_counts() {
        let (writer, node, ns) = writer_and_node();
        let identity = SeriesIdentity::new("foo", TagSet::from_pairs(&[("__name__", "cpu")]));
        let before = metrics::LARGE_TILE_WRITES_TOTAL.get();

        writer
            .write_tile(&ns, &identity, &DataPoint::new(1_000, 42.0), false)
            .unwrap();

        let got = node
            .fetch(&ns, "foo", TimeRange::new(0, 2_000).unwrap())
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].value, 42.0);
        assert_eq!(metrics::LARGE_TILE_WRITES_TOTAL.get(), before + 1);
    }

    #[test]
    fn test_write_tile_unknown_namespace_fails() {
        let (writer, _, _) = writer_and_node();
        let identity = SeriesIdentity::new("foo", TagSet::new());
        let err = writer
            .write_tile(
                &NamespaceId::new("missing"),
                &identity,
                &DataPoint::new(1_000, 1.0),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, WriteError::NamespaceNotFound(_)));
    }

    #[test]
    fn test_rewriting_same_tile_is_idempotent() {
        let (writer, node, ns) = writer_and_node();
        let identity = SeriesIdentity::new("foo", TagSet::new());
        let tile = DataPoint::new(1_000, 42.0);

        writer.write_tile(&ns, &identity, &tile, false).unwrap();
        writer.write_tile(&ns, &identity, &tile, false).unwrap();

        let got = node
            .fetch(&ns, "foo", TimeRange::new(0, 2_000).unwrap())
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].value, 42.0);
    }
}
