//! Namespace registry and retention configuration
//!
//! A namespace is a logically isolated dataset with its own retention and
//! indexing configuration. The aggregation core only ever reads namespace
//! metadata; creation and ownership live with the control plane.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::ValidationError;

/// Namespace identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceId(pub String);

impl NamespaceId {
    /// Create a namespace identifier
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NamespaceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Retention configuration for a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionOptions {
    /// Duration of one storage block, milliseconds
    pub block_size_ms: i64,

    /// How long data is retained, milliseconds
    pub retention_period_ms: i64,
}

impl RetentionOptions {
    /// Create retention options, validating a positive block size
    pub fn new(
        block_size_ms: i64,
        retention_period_ms: i64,
    ) -> std::result::Result<Self, ValidationError> {
        if block_size_ms <= 0 {
            return Err(ValidationError::Failed(format!(
                "block size must be positive, got {}ms",
                block_size_ms
            )));
        }
        if retention_period_ms <= 0 {
            return Err(ValidationError::Failed(format!(
                "retention period must be positive, got {}ms",
                retention_period_ms
            )));
        }
        Ok(Self {
            block_size_ms,
            retention_period_ms,
        })
    }
}

/// Index configuration for a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOptions {
    /// Whether indexing is enabled
    pub enabled: bool,

    /// Duration of one index block, milliseconds
    pub block_size_ms: i64,
}

/// Metadata describing a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMetadata {
    /// Namespace identity
    pub id: NamespaceId,

    /// Retention configuration
    pub retention: RetentionOptions,

    /// Optional index configuration
    pub index: Option<IndexOptions>,

    /// Whether cold (out-of-order) writes are accepted
    pub cold_writes_enabled: bool,
}

impl NamespaceMetadata {
    /// Create namespace metadata with cold writes enabled and no index
    pub fn new(id: NamespaceId, retention: RetentionOptions) -> Self {
        Self {
            id,
            retention,
            index: None,
            cold_writes_enabled: true,
        }
    }

    /// Set index options
    pub fn with_index(mut self, index: IndexOptions) -> Self {
        self.index = Some(index);
        self
    }

    /// Enable or disable cold writes
    pub fn with_cold_writes(mut self, enabled: bool) -> Self {
        self.cold_writes_enabled = enabled;
        self
    }
}

/// In-memory namespace registry
///
/// Resolves a namespace identifier to its metadata. Registration happens
/// at node bootstrap; the aggregation path only resolves.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    namespaces: RwLock<HashMap<NamespaceId, NamespaceMetadata>>,
}

impl NamespaceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace, replacing any previous metadata for the same id
    pub fn register(&self, metadata: NamespaceMetadata) {
        self.namespaces
            .write()
            .insert(metadata.id.clone(), metadata);
    }

    /// Resolve a namespace identifier to its metadata
    pub fn resolve(
        &self,
        id: &NamespaceId,
    ) -> std::result::Result<NamespaceMetadata, ValidationError> {
        self.namespaces
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ValidationError::NamespaceNotFound(id.to_string()))
    }

    /// Whether a namespace is registered
    pub fn contains(&self, id: &NamespaceId) -> bool {
        self.namespaces.read().contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 3_600_000;

    #[test]
    fn test_register_and_resolve() {
        let registry = NamespaceRegistry::new();
        let retention = RetentionOptions::new(2 * HOUR_MS, 152 * HOUR_MS).unwrap();
        registry.register(NamespaceMetadata::new(NamespaceId::new("raw"), retention));

        let meta = registry.resolve(&NamespaceId::new("raw")).unwrap();
        assert_eq!(meta.retention.block_size_ms, 2 * HOUR_MS);
        assert!(meta.cold_writes_enabled);
    }

    #[test]
    fn test_unknown_namespace_fails_resolution() {
        let registry = NamespaceRegistry::new();
        let err = registry.resolve(&NamespaceId::new("missing")).unwrap_err();
        assert!(matches!(err, ValidationError::NamespaceNotFound(_)));
    }

    #[test]
    fn test_retention_validation() {
        assert!(RetentionOptions::new(0, HOUR_MS).is_err());
        assert!(RetentionOptions::new(HOUR_MS, -1).is_err());
    }

    #[test]
    fn test_index_and_cold_write_flags() {
        let retention = RetentionOptions::new(HOUR_MS, 10 * HOUR_MS).unwrap();
        let meta = NamespaceMetadata::new(NamespaceId::new("agg"), retention)
            .with_index(IndexOptions {
                enabled: true,
                block_size_ms: 2 * HOUR_MS,
            })
            .with_cold_writes(false);

        assert!(!meta.cold_writes_enabled);
        assert_eq!(meta.index.unwrap().block_size_ms, 2 * HOUR_MS);
    }
}
