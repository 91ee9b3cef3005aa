//! Branching and validation expressions over answers.
//!
//! Expressions are side-effect-free predicates such as
//! `likesPets == "yes" and age >= 18` or `country not in ["UK", "IE"]`. Identifiers
//! name answers; dotted paths reach into structured answers (`address.postcode`).
//! A missing answer evaluates to `null`, and comparisons between values of
//! incompatible types are false rather than errors.

mod parser;

use std::cmp::Ordering;

use serde_json::Value;

use super::domain::Condition;
use super::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Answer(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    In {
        needle: Box<Expr>,
        haystack: Box<Expr>,
        negated: bool,
    },
}

impl Expr {
    pub fn parse(expression: &str) -> Result<Self, ConfigurationError> {
        parser::parse(expression).map_err(|err| ConfigurationError::InvalidExpression {
            expression: expression.to_string(),
            reason: format!("{} at offset {}", err.message, err.position),
        })
    }

    /// Evaluates to a JSON value against an object of answers.
    pub fn value(&self, ctx: &Value) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Answer(path) => lookup(ctx, path).cloned().unwrap_or(Value::Null),
            Expr::List(items) => Value::Array(items.iter().map(|item| item.value(ctx)).collect()),
            Expr::Not(inner) => Value::Bool(!inner.holds(ctx)),
            Expr::And(left, right) => Value::Bool(left.holds(ctx) && right.holds(ctx)),
            Expr::Or(left, right) => Value::Bool(left.holds(ctx) || right.holds(ctx)),
            Expr::Compare { op, left, right } => {
                let left = left.value(ctx);
                let right = right.value(ctx);
                Value::Bool(match op {
                    CompareOp::Eq => loose_eq(&left, &right),
                    CompareOp::Ne => !loose_eq(&left, &right),
                    CompareOp::Lt => compare(&left, &right) == Some(Ordering::Less),
                    CompareOp::Lte => matches!(
                        compare(&left, &right),
                        Some(Ordering::Less | Ordering::Equal)
                    ),
                    CompareOp::Gt => compare(&left, &right) == Some(Ordering::Greater),
                    CompareOp::Gte => matches!(
                        compare(&left, &right),
                        Some(Ordering::Greater | Ordering::Equal)
                    ),
                })
            }
            Expr::In {
                needle,
                haystack,
                negated,
            } => {
                let found = contains(&haystack.value(ctx), &needle.value(ctx));
                Value::Bool(found != *negated)
            }
        }
    }

    /// Evaluates and coerces the result to a boolean.
    pub fn holds(&self, ctx: &Value) -> bool {
        truthy(&self.value(ctx))
    }
}

/// Parses and evaluates `expression` against `ctx`.
pub fn evaluate(expression: &str, ctx: &Value) -> Result<bool, ConfigurationError> {
    Ok(Expr::parse(expression)?.holds(ctx))
}

/// First condition, in declaration order, whose expression holds.
pub fn first_match<'a>(
    conditions: &'a [Condition],
    ctx: &Value,
) -> Result<Option<&'a Condition>, ConfigurationError> {
    for condition in conditions {
        if evaluate(&condition.expression, ctx)? {
            return Ok(Some(condition));
        }
    }
    Ok(None)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn lookup<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = ctx;
    for segment in path.split('.').filter(|segment| !segment.is_empty()) {
        current = match current {
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            other => other.get(segment)?,
        };
    }
    Some(current)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            match (as_number(left), as_number(right)) {
                (Some(l), Some(r)) => l == r,
                _ => false,
            }
        }
        (Value::Number(l), Value::Number(r)) => l.as_f64() == r.as_f64(),
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(l), Value::String(r)) => match (as_number(left), as_number(right)) {
            (Some(l), Some(r)) => l.partial_cmp(&r),
            _ => Some(l.cmp(r)),
        },
        (Value::Null, _) | (_, Value::Null) => None,
        _ => as_number(left)?.partial_cmp(&as_number(right)?),
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| loose_eq(item, needle)),
        Value::String(text) => needle.as_str().is_some_and(|part| text.contains(part)),
        Value::Object(map) => needle.as_str().is_some_and(|key| map.contains_key(key)),
        _ => false,
    }
}
