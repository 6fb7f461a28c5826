/*!
# Comparison Operators

Leaf operators applied to a single resolved field value. The resolved value
is `None` when the field path is absent; no operator ever faults on an absent
value.

## Equality

Equality is deliberately strict about types. Two values are *loosely equal*
when:

- both are `null`, or both are booleans with the same value;
- both are numbers with the same numeric value (`1 == 1.0`);
- both are strings with the same contents;
- both are arrays of the same length whose elements are pairwise loosely
  equal, or both are objects with the same key set whose values are loosely
  equal.

Values of different types are never equal, so `"1"` does not equal `1`.

## Ordering

`$lt`, `$lte`, `$gt`, and `$gte` order numbers numerically, strings by code
point, and booleans with `false < true`. Every other pairing, including an
absent field, compares as unordered and the operator yields `false`.
*/
use serde_json::{Number, Value};
use std::{cmp::Ordering, fmt::Display, str::FromStr};

/// The closed set of recognized comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// `$exists`: presence (or absence, with a falsy operand) of the field
    Exists,
    /// `$lt`: strictly less than
    Lt,
    /// `$lte`: less than or equal
    Lte,
    /// `$gt`: strictly greater than
    Gt,
    /// `$gte`: greater than or equal
    Gte,
    /// `$ne`: not loosely equal
    Ne,
    /// `$in`: loosely equal to some element of the operand array
    In,
    /// `$nin`: not loosely equal to any element of the operand array
    Nin,
}

impl ComparisonOp {
    /// Every recognized operator, in documentation order.
    pub const ALL: [Self; 8] = [
        Self::Exists,
        Self::Lt,
        Self::Lte,
        Self::Gt,
        Self::Gte,
        Self::Ne,
        Self::In,
        Self::Nin,
    ];

    /// The operator key as it appears in criteria, e.g. `"$gte"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exists => "$exists",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Ne => "$ne",
            Self::In => "$in",
            Self::Nin => "$nin",
        }
    }

    /// Look up an operator by its criteria key. Returns `None` for anything
    /// that is not one of the recognized operators.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == key)
    }

    /// Apply this operator to a resolved field value and the operand from the
    /// criteria.
    #[must_use]
    pub fn apply(self, resolved: Option<&Value>, operand: &Value) -> bool {
        match self {
            Self::Exists => resolved.is_some() == is_truthy(operand),
            Self::Lt => ordered(resolved, operand, Ordering::is_lt),
            Self::Lte => ordered(resolved, operand, Ordering::is_le),
            Self::Gt => ordered(resolved, operand, Ordering::is_gt),
            Self::Gte => ordered(resolved, operand, Ordering::is_ge),
            Self::Ne => !resolved.is_some_and(|v| loosely_equal(v, operand)),
            Self::In => is_member(resolved, operand),
            Self::Nin => !is_member(resolved, operand),
        }
    }
}

impl Display for ComparisonOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unrecognized operator key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl std::error::Error for UnknownOperator {}

impl Display for UnknownOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown comparison operator: {}", self.0)
    }
}

impl FromStr for ComparisonOp {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| UnknownOperator(s.to_string()))
    }
}

fn ordered(
    resolved: Option<&Value>,
    operand: &Value,
    accept: fn(Ordering) -> bool,
) -> bool {
    resolved
        .and_then(|value| compare_values(value, operand))
        .is_some_and(accept)
}

fn is_member(resolved: Option<&Value>, operand: &Value) -> bool {
    let (Some(value), Value::Array(candidates)) = (resolved, operand) else {
        return false;
    };
    candidates.iter().any(|candidate| loosely_equal(value, candidate))
}

/// Truthiness of a JSON value: `false`, `0`, `""`, and `null` are falsy,
/// everything else (including empty arrays and objects) is truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Type-strict structural equality. See the module documentation.
#[must_use]
pub fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => {
            compare_numbers(a, b) == Some(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len()
                && a.iter().zip(b).all(|(x, y)| loosely_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, x)| {
                    b.get(key).is_some_and(|y| loosely_equal(x, y))
                })
        }
        _ => false,
    }
}

/// Order two values if their types are comparable.
#[must_use]
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Numeric comparison that stays exact for integers and falls back to `f64`
/// for mixed or fractional values.
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}
