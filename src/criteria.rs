//! # MongoDB-style Criteria
//!
//! A criteria document is a JSON object describing conditions on documents:
//! - implicit equality on dotted field paths, e.g. `{"address.city": "Paris"}`
//! - comparison operators: `$exists`, `$lt`, `$lte`, `$gt`, `$gte`, `$ne`,
//!   `$in`, `$nin`
//! - logical combinators over lists of criteria: `$and`, `$or`, `$nor`
//! - embedded boolean expressions with `$where`
//!
//! Criteria are parsed once into a [`Criteria`] tree and then evaluated
//! against any number of documents.

pub mod ast;
pub mod compare;
pub mod eval;
pub mod parser;

use std::str::FromStr;

// Re-exports
pub use ast::*;
pub use compare::ComparisonOp;
pub use eval::Evaluation;
pub use parser::{CriteriaParseError, parse_criteria, parse_criteria_str, parse_criteria_with};

impl FromStr for Criteria {
    type Err = CriteriaParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_criteria_str(s)
    }
}

impl TryFrom<&serde_json::Value> for Criteria {
    type Error = CriteriaParseError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        parse_criteria(value)
    }
}
