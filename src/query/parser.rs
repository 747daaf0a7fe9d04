//! PromQL expression parser
//!
//! Parses Prometheus Query Language (PromQL) syntax into the typed
//! expression tree of [`crate::query::ast`].
//!
//! # Supported Syntax
//!
//! ```promql
//! # Instant and range vector selectors
//! cpu_usage
//! cpu_usage{host="server01"}
//! cpu_usage[5m]
//! cpu_usage[5m] offset 1h
//!
//! # Subqueries
//! rate(cpu_usage[5m])[1h:1m]
//! cpu_usage[1h:]
//!
//! # Aggregations and functions
//! sum(cpu_usage) by (host)
//! topk(5, cpu_usage)
//! rate(http_requests_total[5m])
//!
//! # Arithmetic
//! rate(a[5m]) / rate(b[5m]) * 100
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map, opt, value},
    multi::{many0, separated_list0, separated_list1},
    number::complete::double,
    sequence::{delimited, preceded},
    IResult, Parser,
};

use crate::query::ast::{
    AggregationOp, BinaryOp, Expr, LabelMatcher, MatchOp, UnaryOp, VectorSelector,
};
use crate::query::error::{QueryError, QueryResult};

/// Parse a PromQL expression string into an [`Expr`] tree
pub fn parse_query(input: &str) -> QueryResult<Expr> {
    match parse_expr(input.trim()) {
        Ok((remaining, expr)) => {
            if remaining.trim().is_empty() {
                Ok(expr)
            } else {
                Err(QueryError::parse(format!(
                    "unexpected trailing input: '{}'",
                    remaining.trim()
                )))
            }
        }
        Err(e) => Err(QueryError::parse(format!("invalid expression: {e:?}"))),
    }
}

fn fail<T>(input: &str) -> IResult<&str, T> {
    Err(nom::Err::Failure(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Fail,
    )))
}

// ============================================================================
// Expression Grammar
// ============================================================================

/// Parse a full expression at the lowest precedence level
fn parse_expr(input: &str) -> IResult<&str, Expr> {
    parse_add_expr(input)
}

/// Parse `+` and `-` chains, left associative
fn parse_add_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_mul_expr(input)?;
    let (input, rest) = many0((
        delimited(
            multispace0,
            alt((
                value(BinaryOp::Add, char('+')),
                value(BinaryOp::Sub, char('-')),
            )),
            multispace0,
        ),
        parse_mul_expr,
    ))
    .parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

/// Parse `*`, `/` and `%` chains, left associative
fn parse_mul_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_unary_expr(input)?;
    let (input, rest) = many0((
        delimited(
            multispace0,
            alt((
                value(BinaryOp::Mul, char('*')),
                value(BinaryOp::Div, char('/')),
                value(BinaryOp::Mod, char('%')),
            )),
            multispace0,
        ),
        parse_unary_expr,
    ))
    .parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn fold_binary(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    rest.into_iter().fold(first, |lhs, (op, rhs)| Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

/// Parse an optionally signed expression
fn parse_unary_expr(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;
    let (input, sign) = opt(alt((
        value(UnaryOp::Neg, char('-')),
        value(UnaryOp::Pos, char('+')),
    )))
    .parse(input)?;
    let (input, expr) = parse_postfix_expr(input)?;
    Ok((
        input,
        match sign {
            Some(op) => Expr::Unary {
                op,
                expr: Box::new(expr),
            },
            None => expr,
        },
    ))
}

/// Bracket suffix following a primary expression
enum BracketSuffix {
    /// `[5m]`
    Matrix(i64),
    /// `[1h:5m]` or `[1h:]`
    Subquery { range_ms: i64, step_ms: Option<i64> },
}

/// Parse a primary expression with optional `[...]` and `offset` suffixes
fn parse_postfix_expr(input: &str) -> IResult<&str, Expr> {
    let (input, expr) = parse_primary(input)?;
    let (input, suffix) = opt(parse_bracket_suffix).parse(input)?;

    let expr = match suffix {
        None => expr,
        // A range suffix is only valid directly on an instant selector
        Some(BracketSuffix::Matrix(range_ms)) => match expr {
            Expr::VectorSelector(selector) => Expr::MatrixSelector { selector, range_ms },
            _ => return fail(input),
        },
        Some(BracketSuffix::Subquery { range_ms, step_ms }) => Expr::Subquery {
            expr: Box::new(expr),
            range_ms,
            step_ms,
            offset_ms: 0,
        },
    };

    let (input, offset) = opt(preceded(
        (multispace1, tag_no_case("offset"), multispace1),
        parse_duration,
    ))
    .parse(input)?;

    let Some(offset_ms) = offset else {
        return Ok((input, expr));
    };
    let expr = match expr {
        Expr::VectorSelector(mut selector) => {
            selector.offset_ms = offset_ms;
            Expr::VectorSelector(selector)
        }
        Expr::MatrixSelector {
            mut selector,
            range_ms,
        } => {
            selector.offset_ms = offset_ms;
            Expr::MatrixSelector { selector, range_ms }
        }
        Expr::Subquery {
            expr,
            range_ms,
            step_ms,
            ..
        } => Expr::Subquery {
            expr,
            range_ms,
            step_ms,
            offset_ms,
        },
        _ => return fail(input),
    };
    Ok((input, expr))
}

/// Parse `[range]`, `[range:step]` or `[range:]`
fn parse_bracket_suffix(input: &str) -> IResult<&str, BracketSuffix> {
    let (input, _) = (multispace0, char('[')).parse(input)?;
    let (input, range_ms) = parse_duration(input)?;
    let (input, step) = opt(preceded(
        (multispace0, char(':')),
        opt(parse_duration),
    ))
    .parse(input)?;
    let (input, _) = (multispace0, char(']')).parse(input)?;
    Ok((
        input,
        match step {
            None => BracketSuffix::Matrix(range_ms),
            Some(step_ms) => BracketSuffix::Subquery { range_ms, step_ms },
        },
    ))
}

// ============================================================================
// Primary Expressions
// ============================================================================

fn parse_primary(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;
    alt((
        parse_paren,
        parse_string_literal,
        parse_number,
        parse_identifier_led,
    ))
    .parse(input)
}

fn parse_paren(input: &str) -> IResult<&str, Expr> {
    map(
        delimited(char('('), parse_expr, (multispace0, char(')'))),
        |e| Expr::Paren(Box::new(e)),
    )
    .parse(input)
}

fn parse_string_literal(input: &str) -> IResult<&str, Expr> {
    map(parse_string_value, |s| Expr::StringLiteral(s.to_string())).parse(input)
}

/// Parse a number literal
///
/// Only attempted when the input starts with a digit or dot, so metric
/// names beginning with "inf"/"nan" are never swallowed by float parsing.
fn parse_number(input: &str) -> IResult<&str, Expr> {
    match input.chars().next() {
        Some(c) if c.is_ascii_digit() || c == '.' => {
            map(double, Expr::NumberLiteral).parse(input)
        }
        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

/// Parse an expression led by an identifier: aggregation, function call or
/// vector selector
fn parse_identifier_led(input: &str) -> IResult<&str, Expr> {
    let (input, name) = parse_metric_name(input)?;

    if let Some(op) = AggregationOp::from_name(name) {
        if let Ok((input, expr)) = parse_aggregation_body(input, op) {
            return Ok((input, expr));
        }
    }

    let (after_paren, open) = opt(preceded(multispace0, char('('))).parse(input)?;
    if open.is_some() {
        let (input, args) = separated_list0(
            (multispace0, char(','), multispace0),
            parse_expr,
        )
        .parse(after_paren)?;
        let (input, _) = (multispace0, char(')')).parse(input)?;
        return Ok((
            input,
            Expr::Call {
                function: name.to_string(),
                args,
            },
        ));
    }

    let (input, matchers) = opt(parse_label_matchers).parse(input)?;
    Ok((
        input,
        Expr::VectorSelector(VectorSelector {
            metric: name.to_string(),
            matchers: matchers.unwrap_or_default(),
            offset_ms: 0,
        }),
    ))
}

/// Parse the clause and body after an aggregation operator keyword
///
/// Grouping may precede or follow the argument list:
/// `sum by (host) (m)` and `sum(m) by (host)` are both accepted.
fn parse_aggregation_body(input: &str, op: AggregationOp) -> IResult<&str, Expr> {
    let (input, leading) = opt(parse_grouping_clause).parse(input)?;
    let (input, _) = (multispace0, char('(')).parse(input)?;
    let (input, mut args) = separated_list1(
        (multispace0, char(','), multispace0),
        parse_expr,
    )
    .parse(input)?;
    let (input, _) = (multispace0, char(')')).parse(input)?;
    let (input, trailing) = opt(parse_grouping_clause).parse(input)?;

    let (grouping, without) = leading.or(trailing).unwrap_or((vec![], false));
    let (parameter, expr) = match args.len() {
        1 => (None, args.remove(0)),
        2 => {
            let expr = args.remove(1);
            (Some(Box::new(args.remove(0))), expr)
        }
        _ => return fail(input),
    };

    Ok((
        input,
        Expr::Aggregation {
            op,
            parameter,
            expr: Box::new(expr),
            grouping,
            without,
        },
    ))
}

/// Parse a `by (...)` or `without (...)` clause
fn parse_grouping_clause(input: &str) -> IResult<&str, (Vec<String>, bool)> {
    let (input, without) = preceded(
        multispace0,
        alt((
            value(true, tag_no_case("without")),
            value(false, tag_no_case("by")),
        )),
    )
    .parse(input)?;
    let (input, labels) = parse_label_list(input)?;
    Ok((input, (labels, without)))
}

// ============================================================================
// Selectors and Labels
// ============================================================================

/// Parse metric name
fn parse_metric_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == ':' || c == '.')(input)
}

/// Parse label matchers: `{label1="value1", label2!="value2", label3=~"pattern"}`
fn parse_label_matchers(input: &str) -> IResult<&str, Vec<LabelMatcher>> {
    delimited(
        (multispace0, char('{')),
        separated_list0((multispace0, char(','), multispace0), parse_label_matcher),
        (multispace0, char('}')),
    )
    .parse(input)
}

/// Parse a single label matcher with its operator
fn parse_label_matcher(input: &str) -> IResult<&str, LabelMatcher> {
    let (input, _) = multispace0(input)?;
    let (input, name) = parse_label_name(input)?;
    let (input, _) = multispace0(input)?;
    let (input, op) = alt((
        value(MatchOp::RegexMatch, tag("=~")),
        value(MatchOp::RegexNotMatch, tag("!~")),
        value(MatchOp::NotEquals, tag("!=")),
        value(MatchOp::Equals, tag("=")),
    ))
    .parse(input)?;
    let (input, _) = multispace0(input)?;
    let (input, val) = parse_string_value(input)?;

    Ok((
        input,
        LabelMatcher {
            name: name.to_string(),
            op,
            value: val.to_string(),
        },
    ))
}

/// Parse label name
fn parse_label_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

/// Parse a quoted string value
fn parse_string_value(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
    ))
    .parse(input)
}

/// Parse label list for `by`/`without` clauses
fn parse_label_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        (multispace0, char('(')),
        separated_list0(
            (multispace0, char(','), multispace0),
            map(parse_label_name, String::from),
        ),
        (multispace0, char(')')),
    )
    .parse(input)
}

// ============================================================================
// Duration Parsing
// ============================================================================

/// Parse a PromQL duration into milliseconds
fn parse_duration(input: &str) -> IResult<&str, i64> {
    let (input, _) = multispace0(input)?;
    let (input, num_str) = digit1(input)?;
    let (input, unit_ms) = alt((
        value(1i64, tag("ms")),
        value(1_000i64, tag("s")),
        value(60_000i64, tag("m")),
        value(3_600_000i64, tag("h")),
        value(86_400_000i64, tag("d")),
        value(604_800_000i64, tag("w")),
        value(31_536_000_000i64, tag("y")),
    ))
    .parse(input)?;
    match num_str.parse::<i64>() {
        Ok(n) => Ok((input, n * unit_ms)),
        Err(_) => fail(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector_selector_with_matchers() {
        let expr = parse_query(r#"cpu_usage{host="server01", env!~"dev.*"}"#).unwrap();
        match expr {
            Expr::VectorSelector(s) => {
                assert_eq!(s.metric, "cpu_usage");
                assert_eq!(s.matchers.len(), 2);
                assert_eq!(s.matchers[0].name, "host");
                assert_eq!(s.matchers[0].op, MatchOp::Equals);
                assert_eq!(s.matchers[1].op, MatchOp::RegexNotMatch);
                assert_eq!(s.offset_ms, 0);
            }
            other => panic!("expected vector selector, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_matrix_selector_with_offset() {
        let expr = parse_query("cpu_usage[5m] offset 1h").unwrap();
        match expr {
            Expr::MatrixSelector { selector, range_ms } => {
                assert_eq!(range_ms, 300_000);
                assert_eq!(selector.offset_ms, 3_600_000);
            }
            other => panic!("expected matrix selector, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_subquery_with_and_without_step() {
        match parse_query("rate(cpu[5m])[1h:1m]").unwrap() {
            Expr::Subquery {
                range_ms, step_ms, ..
            } => {
                assert_eq!(range_ms, 3_600_000);
                assert_eq!(step_ms, Some(60_000));
            }
            other => panic!("expected subquery, got {other:?}"),
        }
        match parse_query("cpu[1h:]").unwrap() {
            Expr::Subquery { step_ms, .. } => assert_eq!(step_ms, None),
            other => panic!("expected subquery, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_aggregation_with_grouping() {
        for query in ["sum by (host) (cpu_usage)", "sum(cpu_usage) by (host)"] {
            match parse_query(query).unwrap() {
                Expr::Aggregation {
                    op,
                    grouping,
                    without,
                    ..
                } => {
                    assert_eq!(op, AggregationOp::Sum);
                    assert_eq!(grouping, vec!["host".to_string()]);
                    assert!(!without);
                }
                other => panic!("expected aggregation, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_parameterized_aggregation() {
        match parse_query("topk(5, cpu_usage)").unwrap() {
            Expr::Aggregation { op, parameter, .. } => {
                assert_eq!(op, AggregationOp::TopK);
                assert_eq!(*parameter.unwrap(), Expr::NumberLiteral(5.0));
            }
            other => panic!("expected aggregation, got {other:?}"),
        }
    }

    #[test]
    fn test_function_name_sharing_agg_prefix() {
        // "sum_over_time" must not be parsed as the "sum" operator
        match parse_query("sum_over_time(cpu[10m])").unwrap() {
            Expr::Call { function, args } => {
                assert_eq!(function, "sum_over_time");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        // a + b * c groups as a + (b * c)
        match parse_query("a + b * c").unwrap() {
            Expr::Binary { op, rhs, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(
                    *rhs,
                    Expr::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_nested_call_and_division() {
        let expr = parse_query("rate(errors[5m]) / rate(requests[5m]) * 100").unwrap();
        let mut matrix_ranges = Vec::new();
        expr.visit(&mut |e| {
            if let Expr::MatrixSelector { range_ms, .. } = e {
                matrix_ranges.push(*range_ms);
            }
        });
        assert_eq!(matrix_ranges, vec![300_000, 300_000]);
    }

    #[test]
    fn test_parse_unary_negation() {
        match parse_query("-cpu_usage").unwrap() {
            Expr::Unary { op, .. } => assert_eq!(op, UnaryOp::Neg),
            other => panic!("expected unary, got {other:?}"),
        }
    }

    #[test]
    fn test_range_on_non_selector_rejected() {
        assert!(parse_query("(a + b)[5m]").is_err());
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        assert!(parse_query("cpu_usage}").is_err());
        assert!(parse_query("cpu_usage[5m] extra").is_err());
    }

    #[test]
    fn test_duration_units() {
        for (text, ms) in [
            ("x[100ms]", 100),
            ("x[30s]", 30_000),
            ("x[2h]", 7_200_000),
            ("x[1d]", 86_400_000),
            ("x[1w]", 604_800_000),
        ] {
            match parse_query(text).unwrap() {
                Expr::MatrixSelector { range_ms, .. } => assert_eq!(range_ms, ms),
                other => panic!("expected matrix selector, got {other:?}"),
            }
        }
    }
}
