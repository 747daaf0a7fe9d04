//! Temporal range warning pass
//!
//! Walks a parsed query expression, finds every sub-expression selecting a
//! time window, and marks that window as verified on a caller-owned result
//! metadata object. The pass itself never fails after a successful parse;
//! its only side effect is on the metadata passed by reference.
//!
//! The default evaluation interval used for subqueries without an explicit
//! step is an explicit constructor input, never process-wide state.

use crate::query::ast::Expr;
use crate::query::error::QueryResult;
use crate::query::parser::parse_query;

/// Default subquery evaluation interval, one minute
pub const DEFAULT_EVALUATION_INTERVAL_MS: i64 = 60_000;

/// Metadata attached to a query result
///
/// Tracks which temporal ranges of the query have been verified and the
/// evaluation resolutions encountered along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMetadata {
    verified_ranges: Vec<i64>,
    resolutions: Vec<i64>,
}

impl ResultMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a temporal range, in milliseconds, as verified
    pub fn verify_temporal_range(&mut self, range_ms: i64) {
        if !self.verified_ranges.contains(&range_ms) {
            self.verified_ranges.push(range_ms);
        }
    }

    /// Record an evaluation resolution, in milliseconds
    pub fn record_resolution(&mut self, step_ms: i64) {
        if !self.resolutions.contains(&step_ms) {
            self.resolutions.push(step_ms);
        }
    }

    /// Whether a specific range has been verified
    pub fn is_range_verified(&self, range_ms: i64) -> bool {
        self.verified_ranges.contains(&range_ms)
    }

    /// Verified ranges in encounter order
    pub fn verified_ranges(&self) -> &[i64] {
        &self.verified_ranges
    }

    /// Recorded resolutions in encounter order
    pub fn resolutions(&self) -> &[i64] {
        &self.resolutions
    }
}

/// Options for the range warning pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeWarningOptions {
    /// Step assumed for subqueries that omit an explicit one
    pub default_evaluation_interval_ms: i64,
}

impl Default for RangeWarningOptions {
    fn default() -> Self {
        Self {
            default_evaluation_interval_ms: DEFAULT_EVALUATION_INTERVAL_MS,
        }
    }
}

/// Apply range warnings with the default evaluation interval
pub fn apply_range_warnings(query: &str, metadata: &mut ResultMetadata) -> QueryResult<()> {
    apply_range_warnings_with_options(query, metadata, &RangeWarningOptions::default())
}

/// Parse `query` and mark every selected time window as verified
///
/// Fails only when the expression does not parse; in that case the
/// metadata is left untouched. Matrix selector windows and subquery
/// windows are verified; each subquery additionally records its
/// evaluation resolution, falling back to the configured default interval
/// when the step is omitted.
pub fn apply_range_warnings_with_options(
    query: &str,
    metadata: &mut ResultMetadata,
    options: &RangeWarningOptions,
) -> QueryResult<()> {
    let expr = parse_query(query)?;
    expr.visit(&mut |node| match node {
        Expr::MatrixSelector { range_ms, .. } => {
            metadata.verify_temporal_range(*range_ms);
        }
        Expr::Subquery {
            range_ms, step_ms, ..
        } => {
            metadata.verify_temporal_range(*range_ms);
            metadata
                .record_resolution(step_ms.unwrap_or(options.default_evaluation_interval_ms));
        }
        _ => {}
    });
    Ok(())
}
