/*!
# Criteria Model and Builder

The parsed form of a criteria document, and a fluent API for building one in
code.

```
use mongrep::criteria::{Criteria, CriteriaBuilder};
use serde_json::json;

let built = CriteriaBuilder::new().gte("age", 18).eq("status", "active").build();
let parsed: Criteria = r#"{"age": {"$gte": 18}, "status": "active"}"#.parse().unwrap();
assert_eq!(built, parsed);
```
*/
use serde_json::Value;

use crate::criteria::compare::ComparisonOp;
use crate::expr::{ExprError, Program};
use crate::path::FieldPath;

/// A criteria node: every clause must hold for a document to match. An empty
/// node matches every document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Criteria {
    /// The clauses of this node, in the order they are evaluated
    pub clauses: Vec<Clause>,
}

impl Criteria {
    /// Construct a node from its clauses.
    #[must_use]
    pub const fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// Whether the node has no clauses and therefore matches everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Nesting depth of the node, counting combinator lists and nested nodes.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self
            .clauses
            .iter()
            .map(|clause| match clause {
                Clause::And(nodes) | Clause::Or(nodes) | Clause::Nor(nodes) => {
                    nodes.iter().map(Self::depth).max().unwrap_or(0)
                }
                Clause::Nested(node) => node.depth(),
                _ => 0,
            })
            .max()
            .unwrap_or(0)
    }
}

/// A single condition within a criteria node.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `$and`: every node matches (an empty list matches)
    And(Vec<Criteria>),
    /// `$or`: at least one node matches (an empty list does not match)
    Or(Vec<Criteria>),
    /// `$nor`: no node matches (an empty list matches)
    Nor(Vec<Criteria>),
    /// `$where`: an embedded boolean expression
    Where(WhereClause),
    /// A comparison operator applied to the value at a field path
    Compare {
        /// Field the operator applies to
        path: FieldPath,
        /// The operator
        op: ComparisonOp,
        /// The operator's argument
        operand: Value,
    },
    /// Implicit equality between the value at a field path and a literal
    Equals {
        /// Field to compare
        path: FieldPath,
        /// Expected value
        value: Value,
    },
    /// An object that is not a single recognized comparison, evaluated as an
    /// implicit `$and` against the same document
    Nested(Criteria),
    /// A combinator list element that is not an object; never matches
    Malformed(Value),
}

/// A `$where` clause, compiled when the criteria are parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    /// The raw `$where` value from the criteria
    pub source: Value,
    /// The compiled body, or why it failed to compile
    pub program: Result<Program, ExprError>,
}

/// Builder for constructing criteria
pub struct CriteriaBuilder {
    /// The node being built
    criteria: Criteria,
}

impl CriteriaBuilder {
    /// Creates a new builder holding an empty node.
    ///
    /// # Examples
    /// ```
    /// use mongrep::criteria::CriteriaBuilder;
    /// assert!(CriteriaBuilder::new().build().is_empty());
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self { criteria: Criteria::new(vec![]) }
    }

    /// Append an arbitrary clause.
    #[must_use]
    pub fn clause(mut self, clause: Clause) -> Self {
        self.criteria.clauses.push(clause);
        self
    }

    /// Require the field at `path` to equal `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mongrep::criteria::{Clause, CriteriaBuilder};
    /// use serde_json::json;
    /// let criteria = CriteriaBuilder::new().eq("a.b", 2).build();
    /// assert!(matches!(
    ///     &criteria.clauses[..],
    ///     [Clause::Equals { path, value }] if path.as_str() == "a.b" && *value == json!(2)
    /// ));
    /// ```
    #[must_use]
    pub fn eq(self, path: &str, value: impl Into<Value>) -> Self {
        self.clause(Clause::Equals { path: FieldPath::new(path), value: value.into() })
    }

    /// Apply a comparison operator to the field at `path`.
    #[must_use]
    pub fn compare(self, path: &str, op: ComparisonOp, operand: impl Into<Value>) -> Self {
        self.clause(Clause::Compare {
            path: FieldPath::new(path),
            op,
            operand: operand.into(),
        })
    }

    /// `$ne`
    #[must_use]
    pub fn ne(self, path: &str, operand: impl Into<Value>) -> Self {
        self.compare(path, ComparisonOp::Ne, operand)
    }

    /// `$gt`
    #[must_use]
    pub fn gt(self, path: &str, operand: impl Into<Value>) -> Self {
        self.compare(path, ComparisonOp::Gt, operand)
    }

    /// `$gte`
    #[must_use]
    pub fn gte(self, path: &str, operand: impl Into<Value>) -> Self {
        self.compare(path, ComparisonOp::Gte, operand)
    }

    /// `$lt`
    #[must_use]
    pub fn lt(self, path: &str, operand: impl Into<Value>) -> Self {
        self.compare(path, ComparisonOp::Lt, operand)
    }

    /// `$lte`
    #[must_use]
    pub fn lte(self, path: &str, operand: impl Into<Value>) -> Self {
        self.compare(path, ComparisonOp::Lte, operand)
    }

    /// `$in`
    #[must_use]
    pub fn in_values(self, path: &str, values: Vec<Value>) -> Self {
        self.compare(path, ComparisonOp::In, Value::Array(values))
    }

    /// `$nin`
    #[must_use]
    pub fn nin(self, path: &str, values: Vec<Value>) -> Self {
        self.compare(path, ComparisonOp::Nin, Value::Array(values))
    }

    /// `$exists`
    #[must_use]
    pub fn exists(self, path: &str, exists: bool) -> Self {
        self.compare(path, ComparisonOp::Exists, exists)
    }

    /// `$and` over the given nodes.
    #[must_use]
    pub fn and(self, nodes: Vec<Criteria>) -> Self {
        self.clause(Clause::And(nodes))
    }

    /// `$or` over the given nodes.
    ///
    /// # Examples
    ///
    /// ```
    /// use mongrep::criteria::{Clause, CriteriaBuilder};
    /// let criteria = CriteriaBuilder::new()
    ///     .or(vec![
    ///         CriteriaBuilder::new().eq("a", 1).build(),
    ///         CriteriaBuilder::new().eq("b", 2).build(),
    ///     ])
    ///     .build();
    /// assert!(matches!(&criteria.clauses[..], [Clause::Or(nodes)] if nodes.len() == 2));
    /// ```
    #[must_use]
    pub fn or(self, nodes: Vec<Criteria>) -> Self {
        self.clause(Clause::Or(nodes))
    }

    /// `$nor` over the given nodes.
    #[must_use]
    pub fn nor(self, nodes: Vec<Criteria>) -> Self {
        self.clause(Clause::Nor(nodes))
    }

    /// `$where` with the given body, compiled under default limits. A body
    /// that fails to compile is kept and never matches.
    #[must_use]
    pub fn where_expr(self, source: &str) -> Self {
        self.clause(Clause::Where(WhereClause {
            source: Value::String(source.to_string()),
            program: Program::compile(source, &crate::expr::EvalLimits::default()),
        }))
    }

    /// Return the built node.
    #[must_use]
    pub fn build(self) -> Criteria {
        self.criteria
    }
}

impl Default for CriteriaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
