//! # `$where` Expressions
//!
//! A small, side-effect free expression language for `$where` clauses:
//! - literals, top-level document fields as variables, member and index access
//! - arithmetic, relational, equality, and short-circuiting logical operators
//! - nothing else: no assignment, calls, loops, or access to the host process
//!
//! Bodies are compiled once when criteria are parsed and then evaluated per
//! document by an [`ExpressionEvaluator`]. Both steps are bounded by
//! [`EvalLimits`]; any failure makes the clause evaluate to `false` at the
//! call site rather than surfacing to the caller of the matcher.
//!
//! ```
//! use mongrep::expr::{EvalLimits, ExpressionEvaluator, Program, SandboxEvaluator};
//! use serde_json::json;
//!
//! let program = Program::compile("a > 2", &EvalLimits::default()).unwrap();
//! let evaluator = SandboxEvaluator::default();
//! assert_eq!(evaluator.evaluate(&program, &json!({"a": 3})), Ok(true));
//! assert_eq!(evaluator.evaluate(&program, &json!({"a": 1})), Ok(false));
//! ```

pub mod ast;
pub mod interpreter;
pub mod parser;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{error::Error, fmt};

use ast::Expr;
use interpreter::Interpreter;

/// Resource bounds for compiling and evaluating one `$where` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalLimits {
    /// Longest accepted source text, in bytes
    pub max_source_len: usize,
    /// Deepest accepted nesting, both of brackets in the source and of the
    /// compiled tree
    pub max_depth: usize,
    /// Most expression nodes evaluated per document
    pub max_steps: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self { max_source_len: 4096, max_depth: 64, max_steps: 10_000 }
    }
}

/// Errors from compiling or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// The body does not follow the expression grammar.
    Syntax(String),
    /// The `$where` value in the criteria is not a string.
    NotAString(&'static str),
    /// The body is longer than [`EvalLimits::max_source_len`].
    SourceTooLong { len: usize, max: usize },
    /// The body nests deeper than [`EvalLimits::max_depth`].
    TooDeep { max: usize },
    /// The body names a variable that is not a top-level document field.
    UnboundIdentifier(String),
    /// An operator was applied to values it does not support.
    Type(String),
    /// Evaluation visited more than [`EvalLimits::max_steps`] nodes.
    BudgetExhausted { max: usize },
}

impl Error for ExprError {}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(msg) => write!(f, "Syntax error: {msg}"),
            Self::NotAString(found) => {
                write!(f, "Expected a string expression, found {found}")
            }
            Self::SourceTooLong { len, max } => {
                write!(f, "Expression is {len} bytes long, limit is {max}")
            }
            Self::TooDeep { max } => {
                write!(f, "Expression nests deeper than {max} levels")
            }
            Self::UnboundIdentifier(name) => {
                write!(f, "Unbound identifier: {name}")
            }
            Self::Type(msg) => write!(f, "Type error: {msg}"),
            Self::BudgetExhausted { max } => {
                write!(f, "Evaluation exceeded {max} steps")
            }
        }
    }
}

/// A compiled `$where` body.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    source: String,
    expr: Expr,
}

impl Program {
    /// Compile `source` under the structural limits in `limits`.
    ///
    /// # Errors
    ///
    /// See [`parser::compile`].
    pub fn compile(source: &str, limits: &EvalLimits) -> Result<Self, ExprError> {
        let expr = parser::compile(source, limits)?;
        Ok(Self { source: source.to_string(), expr })
    }

    /// The source text this program was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled syntax tree.
    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }
}

/// Evaluates compiled `$where` programs against documents.
///
/// Implementations must be free of shared mutable state so a matcher can be
/// used from several threads at once.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate `program` with the top-level fields of `document` in scope.
    ///
    /// # Errors
    ///
    /// Returns an [`ExprError`] when evaluation fails; the matcher treats any
    /// error as a non-match.
    fn evaluate(&self, program: &Program, document: &Value) -> Result<bool, ExprError>;
}

/// The default evaluator: a step-bounded tree-walking interpreter with no
/// access to anything but the document it is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SandboxEvaluator {
    limits: EvalLimits,
}

impl SandboxEvaluator {
    /// Construct an evaluator with the given runtime limits.
    #[must_use]
    pub const fn new(limits: EvalLimits) -> Self {
        Self { limits }
    }

    /// The limits this evaluator enforces.
    #[must_use]
    pub const fn limits(&self) -> &EvalLimits {
        &self.limits
    }
}

impl ExpressionEvaluator for SandboxEvaluator {
    fn evaluate(&self, program: &Program, document: &Value) -> Result<bool, ExprError> {
        Interpreter::new(document, &self.limits).run(program.expr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn program_keeps_source() {
        let program = Program::compile("a == 1", &EvalLimits::default()).unwrap();
        assert_eq!(program.source(), "a == 1");
        assert_eq!(program.expr().to_string(), "(a == 1)");
    }

    #[test]
    fn sandbox_reports_runtime_errors() {
        let program = Program::compile("b > 1", &EvalLimits::default()).unwrap();
        let evaluator = SandboxEvaluator::default();
        assert_eq!(
            evaluator.evaluate(&program, &json!({"a": 1})),
            Err(ExprError::UnboundIdentifier("b".into()))
        );
    }

    #[test]
    fn sandbox_limits_apply_at_runtime() {
        let program = Program::compile("a + a + a > 0", &EvalLimits::default()).unwrap();
        let evaluator = SandboxEvaluator::new(EvalLimits {
            max_steps: 3,
            ..EvalLimits::default()
        });
        assert_eq!(evaluator.limits().max_steps, 3);
        assert_eq!(
            evaluator.evaluate(&program, &json!({"a": 1})),
            Err(ExprError::BudgetExhausted { max: 3 })
        );
    }

    #[test]
    fn limits_deserialize_with_defaults() {
        let limits: EvalLimits = serde_json::from_str(r#"{"max_steps": 50}"#).unwrap();
        assert_eq!(
            limits,
            EvalLimits { max_steps: 50, ..EvalLimits::default() }
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            ExprError::UnboundIdentifier("x".into()).to_string(),
            "Unbound identifier: x"
        );
        assert_eq!(
            ExprError::SourceTooLong { len: 10, max: 5 }.to_string(),
            "Expression is 10 bytes long, limit is 5"
        );
    }
}
