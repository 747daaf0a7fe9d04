//! Query expression AST
//!
//! A typed expression tree for PromQL-style queries. Every node kind is a
//! variant of [`Expr`], so passes over a query are written as a recursive
//! visit over the tagged union rather than inspecting dynamic types.
//!
//! All durations are carried as milliseconds to match the database
//! timestamp format.

/// PromQL label matching operators
///
/// Supports all four PromQL label matching semantics:
/// - `=`  : Exact string equality
/// - `!=` : String inequality
/// - `=~` : Regex match
/// - `!~` : Regex non-match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    /// Exact equality: label="value"
    Equals,
    /// Inequality: label!="value"
    NotEquals,
    /// Regex match: label=~"pattern"
    RegexMatch,
    /// Regex non-match: label!~"pattern"
    RegexNotMatch,
}

/// Single label matcher inside a vector selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    /// Label name
    pub name: String,
    /// Match operator
    pub op: MatchOp,
    /// Value or pattern to match against
    pub value: String,
}

/// Instant vector selector: `metric{label="value"} offset 5m`
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSelector {
    /// Metric name
    pub metric: String,
    /// Label matchers, in source order
    pub matchers: Vec<LabelMatcher>,
    /// Offset shifting the evaluation time backward, 0 when absent
    pub offset_ms: i64,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Numeric negation
    Neg,
    /// Identity
    Pos,
}

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Modulo
    Mod,
}

/// Aggregation operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationOp {
    /// Sum over dimensions
    Sum,
    /// Average over dimensions
    Avg,
    /// Minimum over dimensions
    Min,
    /// Maximum over dimensions
    Max,
    /// Count of series
    Count,
    /// Population standard deviation
    StdDev,
    /// Population standard variance
    StdVar,
    /// Largest k elements
    TopK,
    /// Smallest k elements
    BottomK,
    /// Quantile over dimensions
    Quantile,
    /// Count of distinct values
    CountValues,
}

impl AggregationOp {
    /// Map an operator keyword to its variant
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(AggregationOp::Sum),
            "avg" => Some(AggregationOp::Avg),
            "min" => Some(AggregationOp::Min),
            "max" => Some(AggregationOp::Max),
            "count" => Some(AggregationOp::Count),
            "stddev" => Some(AggregationOp::StdDev),
            "stdvar" => Some(AggregationOp::StdVar),
            "topk" => Some(AggregationOp::TopK),
            "bottomk" => Some(AggregationOp::BottomK),
            "quantile" => Some(AggregationOp::Quantile),
            "count_values" => Some(AggregationOp::CountValues),
            _ => None,
        }
    }
}

/// Query expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Scalar number literal
    NumberLiteral(f64),

    /// String literal
    StringLiteral(String),

    /// Instant vector selector
    VectorSelector(VectorSelector),

    /// Range vector selector: `metric[5m]`
    MatrixSelector {
        /// Underlying instant selector
        selector: VectorSelector,
        /// Selected time window in milliseconds
        range_ms: i64,
    },

    /// Subquery: `expr[1h:5m]`
    Subquery {
        /// Inner expression evaluated over the range
        expr: Box<Expr>,
        /// Subquery window in milliseconds
        range_ms: i64,
        /// Evaluation step; `None` means the engine's default interval
        step_ms: Option<i64>,
        /// Offset shifting the window backward, 0 when absent
        offset_ms: i64,
    },

    /// Unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        expr: Box<Expr>,
    },

    /// Binary arithmetic operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },

    /// Parenthesized sub-expression
    Paren(Box<Expr>),

    /// Function call: `rate(metric[5m])`
    Call {
        /// Function name
        function: String,
        /// Arguments in source order
        args: Vec<Expr>,
    },

    /// Aggregation: `sum by (host) (metric)`
    Aggregation {
        /// Operator
        op: AggregationOp,
        /// Scalar parameter for parameterized operators like `topk`
        parameter: Option<Box<Expr>>,
        /// Aggregated expression
        expr: Box<Expr>,
        /// Grouping labels
        grouping: Vec<String>,
        /// True for `without`, false for `by`
        without: bool,
    },
}

impl Expr {
    /// Visit this node and all descendants in pre-order
    pub fn visit<F: FnMut(&Expr)>(&self, f: &mut F) {
        f(self);
        match self {
            Expr::NumberLiteral(_) | Expr::StringLiteral(_) | Expr::VectorSelector(_) => {}
            Expr::MatrixSelector { .. } => {}
            Expr::Subquery { expr, .. } => expr.visit(f),
            Expr::Unary { expr, .. } => expr.visit(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.visit(f);
                rhs.visit(f);
            }
            Expr::Paren(expr) => expr.visit(f),
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.visit(f);
                }
            }
            Expr::Aggregation {
                parameter, expr, ..
            } => {
                if let Some(parameter) = parameter {
                    parameter.visit(f);
                }
                expr.visit(f);
            }
        }
    }
}
