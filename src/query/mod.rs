//! Query expression boundary
//!
//! The node does not evaluate queries itself; expressions are forwarded to
//! an external engine. What lives here is the typed expression tree, the
//! PromQL parser producing it, and the range-warning pass that annotates
//! result metadata with the temporal windows a query selects.

pub mod ast;
pub mod error;
pub mod parser;
pub mod range_warnings;

pub use ast::{Expr, LabelMatcher, MatchOp, VectorSelector};
pub use error::{QueryError, QueryErrorKind, QueryResult};
pub use parser::parse_query;
pub use range_warnings::{
    apply_range_warnings, apply_range_warnings_with_options, RangeWarningOptions, ResultMetadata,
};
