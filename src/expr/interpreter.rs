/*!
# Expression Interpreter

Tree-walking evaluation of a compiled [`Expr`] against one document.

The only names in scope are the top-level fields of the document. Values are
borrowed from the document wherever possible; only arithmetic results and
string concatenations allocate.
*/
use serde_json::{Map, Value};
use std::{borrow::Cow, cmp::Ordering};

use crate::criteria::compare::loosely_equal;
use crate::expr::{
    EvalLimits, ExprError,
    ast::{BinaryOp, Expr, Literal, UnaryOp},
};

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Eval<'a> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Cow<'a, str>),
    Array(&'a [Value]),
    Object(&'a Map<String, Value>),
}

impl<'a> From<&'a Value> for Eval<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Self::Str(Cow::Borrowed(s)),
            Value::Array(items) => Self::Array(items),
            Value::Object(map) => Self::Object(map),
        }
    }
}

impl<'a> From<&'a Literal> for Eval<'a> {
    fn from(literal: &'a Literal) -> Self {
        match literal {
            Literal::Undefined => Self::Undefined,
            Literal::Null => Self::Null,
            Literal::Bool(b) => Self::Bool(*b),
            Literal::Number(n) => Self::Number(*n),
            Literal::String(s) => Self::Str(Cow::Borrowed(s)),
        }
    }
}

impl Eval<'_> {
    /// Truthiness in the usual scripting sense: `undefined`, `null`, `false`,
    /// `0`, `NaN`, and `""` are falsy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) => true,
        }
    }

    const fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// String form of a primitive, used for concatenation and computed keys.
    fn primitive_string(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Undefined => Some(Cow::Borrowed("undefined")),
            Self::Null => Some(Cow::Borrowed("null")),
            Self::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
            Self::Number(n) => Some(Cow::Owned(number_string(*n))),
            Self::Str(s) => Some(Cow::Borrowed(s)),
            Self::Array(_) | Self::Object(_) => None,
        }
    }
}

fn number_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

/// Evaluates one expression against the fields of one document, counting
/// every visited node against the step budget.
pub struct Interpreter<'a> {
    bindings: Option<&'a Map<String, Value>>,
    limits: &'a EvalLimits,
    steps: usize,
}

impl<'a> Interpreter<'a> {
    /// Bind the top-level fields of `document`. Documents that are not
    /// objects bind nothing.
    #[must_use]
    pub const fn new(document: &'a Value, limits: &'a EvalLimits) -> Self {
        let bindings = match document {
            Value::Object(map) => Some(map),
            _ => None,
        };
        Self { bindings, limits, steps: 0 }
    }

    /// Number of nodes evaluated so far.
    #[cfg(test)]
    const fn steps(&self) -> usize {
        self.steps
    }

    /// Evaluate `expr` and return the truthiness of its value.
    ///
    /// # Errors
    ///
    /// Returns an [`ExprError`] for unbound identifiers, type errors, and
    /// exceeded limits.
    pub fn run(&mut self, expr: &'a Expr) -> Result<bool, ExprError> {
        Ok(self.eval(expr, 0)?.is_truthy())
    }

    /// Evaluate `expr` to a runtime value.
    ///
    /// # Errors
    ///
    /// See [`Interpreter::run`].
    pub fn eval(
        &mut self,
        expr: &'a Expr,
        depth: usize,
    ) -> Result<Eval<'a>, ExprError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(ExprError::BudgetExhausted { max: self.limits.max_steps });
        }
        if depth >= self.limits.max_depth {
            return Err(ExprError::TooDeep { max: self.limits.max_depth });
        }

        match expr {
            Expr::Literal(literal) => Ok(literal.into()),
            Expr::Identifier(name) => self
                .bindings
                .and_then(|fields| fields.get(name))
                .map(Eval::from)
                .ok_or_else(|| ExprError::UnboundIdentifier(name.clone())),
            Expr::Member(target, name) => {
                let target = self.eval(target, depth + 1)?;
                property(target, name)
            }
            Expr::Index(target, index) => {
                let target = self.eval(target, depth + 1)?;
                let index = self.eval(index, depth + 1)?;
                let key = index.primitive_string().ok_or_else(|| {
                    ExprError::Type(format!(
                        "cannot use {} as a property key",
                        index.type_name()
                    ))
                })?;
                property(target, &key)
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, depth + 1)?;
                unary(*op, &value)
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                let left = self.eval(lhs, depth + 1)?;
                if left.is_truthy() { Ok(left) } else { self.eval(rhs, depth + 1) }
            }
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                let left = self.eval(lhs, depth + 1)?;
                if left.is_truthy() { self.eval(rhs, depth + 1) } else { Ok(left) }
            }
            Expr::Binary(op, lhs, rhs) => {
                let left = self.eval(lhs, depth + 1)?;
                let right = self.eval(rhs, depth + 1)?;
                binary(*op, &left, &right)
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn property<'a>(target: Eval<'a>, key: &str) -> Result<Eval<'a>, ExprError> {
    match target {
        Eval::Undefined | Eval::Null => Err(ExprError::Type(format!(
            "cannot read property {key:?} of {}",
            target.type_name()
        ))),
        Eval::Object(fields) => {
            Ok(fields.get(key).map_or(Eval::Undefined, Eval::from))
        }
        Eval::Array(items) if key == "length" => {
            Ok(Eval::Number(items.len() as f64))
        }
        Eval::Array(items) => Ok(key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .map_or(Eval::Undefined, Eval::from)),
        Eval::Str(s) if key == "length" => {
            Ok(Eval::Number(s.encode_utf16().count() as f64))
        }
        Eval::Str(s) => Ok(key
            .parse::<usize>()
            .ok()
            .and_then(|i| s.encode_utf16().nth(i))
            .map_or(Eval::Undefined, |unit| {
                // A lone surrogate half has no UTF-8 form
                Eval::Str(Cow::Owned(String::from_utf16_lossy(&[unit])))
            })),
        Eval::Bool(_) | Eval::Number(_) => Ok(Eval::Undefined),
    }
}

fn unary<'a>(op: UnaryOp, value: &Eval<'_>) -> Result<Eval<'a>, ExprError> {
    match (op, value) {
        (UnaryOp::Not, value) => Ok(Eval::Bool(!value.is_truthy())),
        (UnaryOp::Negate, Eval::Number(n)) => Ok(Eval::Number(-n)),
        (UnaryOp::Plus, Eval::Number(n)) => Ok(Eval::Number(*n)),
        (_, value) => Err(ExprError::Type(format!(
            "unary operator expects a number, got {}",
            value.type_name()
        ))),
    }
}

fn binary<'a>(
    op: BinaryOp,
    left: &Eval<'_>,
    right: &Eval<'_>,
) -> Result<Eval<'a>, ExprError> {
    let result = match op {
        BinaryOp::Eq => Eval::Bool(equal_or_nullish(left, right)),
        BinaryOp::NotEq => Eval::Bool(!equal_or_nullish(left, right)),
        BinaryOp::StrictEq => Eval::Bool(strictly_equal(left, right)),
        BinaryOp::StrictNotEq => Eval::Bool(!strictly_equal(left, right)),
        BinaryOp::Lt => Eval::Bool(order(left, right).is_some_and(Ordering::is_lt)),
        BinaryOp::Lte => Eval::Bool(order(left, right).is_some_and(Ordering::is_le)),
        BinaryOp::Gt => Eval::Bool(order(left, right).is_some_and(Ordering::is_gt)),
        BinaryOp::Gte => Eval::Bool(order(left, right).is_some_and(Ordering::is_ge)),
        BinaryOp::Add => match (left, right) {
            (Eval::Number(a), Eval::Number(b)) => Eval::Number(a + b),
            (Eval::Str(_), _) | (_, Eval::Str(_)) => {
                match (left.primitive_string(), right.primitive_string()) {
                    (Some(a), Some(b)) => Eval::Str(Cow::Owned(format!("{a}{b}"))),
                    _ => return Err(type_mismatch(op, left, right)),
                }
            }
            _ => return Err(type_mismatch(op, left, right)),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (Eval::Number(a), Eval::Number(b)) = (left, right) else {
                return Err(type_mismatch(op, left, right));
            };
            Eval::Number(match op {
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            })
        }
        // Reached only when both sides are already evaluated; `eval`
        // short-circuits these itself.
        BinaryOp::Or => Eval::Bool(left.is_truthy() || right.is_truthy()),
        BinaryOp::And => Eval::Bool(left.is_truthy() && right.is_truthy()),
    };
    Ok(result)
}

fn type_mismatch(op: BinaryOp, left: &Eval<'_>, right: &Eval<'_>) -> ExprError {
    ExprError::Type(format!(
        "unsupported operand types for {op:?}: {} and {}",
        left.type_name(),
        right.type_name()
    ))
}

/// `==`: strict equality, except that `null` and `undefined` equal each other.
fn equal_or_nullish(left: &Eval<'_>, right: &Eval<'_>) -> bool {
    matches!(
        (left, right),
        (Eval::Null | Eval::Undefined, Eval::Null | Eval::Undefined)
    ) || strictly_equal(left, right)
}

/// `===`: same type and same value. Arrays and objects compare structurally.
fn strictly_equal(left: &Eval<'_>, right: &Eval<'_>) -> bool {
    match (left, right) {
        (Eval::Undefined, Eval::Undefined) | (Eval::Null, Eval::Null) => true,
        (Eval::Bool(a), Eval::Bool(b)) => a == b,
        #[allow(clippy::float_cmp)]
        (Eval::Number(a), Eval::Number(b)) => a == b,
        (Eval::Str(a), Eval::Str(b)) => a == b,
        (Eval::Array(a), Eval::Array(b)) => {
            a.len() == b.len() && a.iter().zip(*b).all(|(x, y)| loosely_equal(x, y))
        }
        (Eval::Object(a), Eval::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, x)| b.get(k).is_some_and(|y| loosely_equal(x, y)))
        }
        _ => false,
    }
}

fn order(left: &Eval<'_>, right: &Eval<'_>) -> Option<Ordering> {
    match (left, right) {
        (Eval::Number(a), Eval::Number(b)) => a.partial_cmp(b),
        (Eval::Str(a), Eval::Str(b)) => Some(a.cmp(b)),
        (Eval::Bool(a), Eval::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
