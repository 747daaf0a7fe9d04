//! Configuration management
//!
//! TOML configuration with environment variable overrides and sensible
//! defaults. Every tunable the engine reads at construction time comes
//! through here; nothing is read from process-wide mutable state.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::query::range_warnings::DEFAULT_EVALUATION_INTERVAL_MS;
use crate::tile::{AggregationPolicy, ReadFailurePolicy};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Tile aggregation tuning
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Query boundary settings
    #[serde(default)]
    pub query: QueryConfig,

    /// Monitoring and observability
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Tile aggregation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregationConfig {
    /// Workers for per-block series aggregation; 0 or 1 runs sequentially
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Behavior when a source block cannot be read
    #[serde(default)]
    pub on_read_error: ReadFailurePolicy,

    /// Reduction applied within each bucket
    #[serde(default)]
    pub policy: AggregationPolicy,
}

/// Query boundary configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Evaluation interval assumed for subqueries without an explicit step
    #[serde(default = "default_evaluation_interval_ms")]
    pub default_evaluation_interval_ms: i64,
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions
fn default_worker_count() -> usize {
    1
}
fn default_evaluation_interval_ms() -> i64 {
    DEFAULT_EVALUATION_INTERVAL_MS
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            on_read_error: ReadFailurePolicy::default(),
            policy: AggregationPolicy::default(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_evaluation_interval_ms: default_evaluation_interval_ms(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(workers) = std::env::var("TSDB_AGG_WORKERS") {
            if let Ok(w) = workers.parse() {
                self.aggregation.worker_count = w;
            }
        }
        if let Ok(interval) = std::env::var("TSDB_EVAL_INTERVAL_MS") {
            if let Ok(i) = interval.parse() {
                self.query.default_evaluation_interval_ms = i;
            }
        }
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.monitoring.log_level = log_level;
        }
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<()> {
        if self.query.default_evaluation_interval_ms <= 0 {
            return Err(Error::Configuration(
                "default_evaluation_interval_ms must be positive".to_string(),
            ));
        }
        if self.aggregation.worker_count > 1024 {
            return Err(Error::Configuration(format!(
                "worker_count {} exceeds the 1024 worker limit",
                self.aggregation.worker_count
            )));
        }
        Ok(())
    }
}
