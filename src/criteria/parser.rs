/*!
# Criteria Parser

Converts criteria documents (parsed JSON) into [`Criteria`] nodes once, ahead
of evaluation.

The parser is total over objects: every criteria object parses, with unknown
or malformed shapes falling back to an implicit `$and` over the object's keys.
The only failures are input that is not JSON at all, and a root that is not
an object:

```rust
use mongrep::criteria::parser::{self, CriteriaParseError};
use serde_json::json;

assert!(parser::parse_criteria(&json!({"a": {"$bogus": 1}})).is_ok());
assert!(matches!(
    parser::parse_criteria(&json!([1, 2])),
    Err(CriteriaParseError::NotAnObject("array"))
));
```

## Shapes

For each key `k` with value `v` in a node:

| Key / value | Clause |
|---|---|
| `$and`/`$or`/`$nor` with an array | combinator over the array's objects |
| `$where` with anything | compiled expression |
| `v` is `{"<op>": x}` for a recognized operator | comparison on path `k` |
| `v` is any other object | nested node; operator keys inside apply to `k` |
| `v` is an array | deep equality between path `k` and the whole array |
| anything else | equality between path `k` and `v` |

Keys are taken in the order they were written, so a node stops at its first
failing key.

An array under a field key is a literal, not a list of criteria:
`{"tags": ["a", "b"]}` matches a document whose `tags` is exactly
`["a", "b"]`. Arrays only hold criteria under `$and`, `$or` and `$nor`.
*/
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;

use crate::criteria::ast::{Clause, Criteria, WhereClause};
use crate::criteria::compare::ComparisonOp;
use crate::expr::{EvalLimits, ExprError, Program};
use crate::path::FieldPath;

/// Represents errors that can occur while parsing criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaParseError {
    /// The criteria text is not valid JSON.
    InvalidJson(String),
    /// The criteria root is not an object; holds the JSON type found instead.
    NotAnObject(&'static str),
}

impl Error for CriteriaParseError {}

impl fmt::Display for CriteriaParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson(msg) => write!(f, "Invalid JSON: {msg}"),
            Self::NotAnObject(found) => {
                write!(f, "Criteria must be an object, found {found}")
            }
        }
    }
}

/// Name of a JSON value's type, for error messages.
pub(crate) const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse a criteria document, compiling `$where` bodies under default limits.
///
/// # Errors
///
/// Returns [`CriteriaParseError::NotAnObject`] if the root is not an object.
pub fn parse_criteria(value: &Value) -> Result<Criteria, CriteriaParseError> {
    parse_criteria_with(value, &EvalLimits::default())
}

/// Parse a criteria document, compiling `$where` bodies under `limits`.
///
/// # Errors
///
/// Returns [`CriteriaParseError::NotAnObject`] if the root is not an object.
pub fn parse_criteria_with(
    value: &Value,
    limits: &EvalLimits,
) -> Result<Criteria, CriteriaParseError> {
    match value {
        Value::Object(node) => Ok(CriteriaParser { limits }.node(node, None)),
        other => Err(CriteriaParseError::NotAnObject(json_type(other))),
    }
}

/// Parse criteria from JSON text.
///
/// # Errors
///
/// Returns [`CriteriaParseError::InvalidJson`] for malformed text, and
/// [`CriteriaParseError::NotAnObject`] if the root is not an object.
pub fn parse_criteria_str(input: &str) -> Result<Criteria, CriteriaParseError> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| CriteriaParseError::InvalidJson(e.to_string()))?;
    parse_criteria(&value)
}

struct CriteriaParser<'l> {
    limits: &'l EvalLimits,
}

impl CriteriaParser<'_> {
    /// Parse one node. `bound` is the field path that operator keys in this
    /// node apply to, if the node is the value of a field key.
    fn node(&self, node: &Map<String, Value>, bound: Option<&FieldPath>) -> Criteria {
        Criteria::new(
            node.iter()
                .map(|(key, value)| self.clause(key, value, bound))
                .collect(),
        )
    }

    fn clause(&self, key: &str, value: &Value, bound: Option<&FieldPath>) -> Clause {
        // Sibling operators of a multi-key comparison object, e.g. the `$lte`
        // in `{"a": {"$gte": 1, "$lte": 10}}`
        if let (Some(path), Some(op)) = (bound, ComparisonOp::from_key(key)) {
            return Clause::Compare { path: path.clone(), op, operand: value.clone() };
        }

        match (key, value) {
            ("$and", Value::Array(items)) => Clause::And(self.list(items)),
            ("$or", Value::Array(items)) => Clause::Or(self.list(items)),
            ("$nor", Value::Array(items)) => Clause::Nor(self.list(items)),
            ("$where", source) => Clause::Where(self.where_clause(source)),
            (key, Value::Object(object)) => {
                let path = FieldPath::new(key);
                if let Some((op, operand)) = single_operator(object) {
                    Clause::Compare { path, op, operand: operand.clone() }
                } else {
                    log::debug!(
                        "Treating {key:?} as a nested node over {} key(s)",
                        object.len()
                    );
                    Clause::Nested(self.node(object, Some(&path)))
                }
            }
            (key, literal) => Clause::Equals {
                path: FieldPath::new(key),
                value: literal.clone(),
            },
        }
    }

    fn list(&self, items: &[Value]) -> Vec<Criteria> {
        items
            .iter()
            .map(|item| match item {
                Value::Object(node) => self.node(node, None),
                other => {
                    log::debug!(
                        "Combinator element is a {}, it will never match",
                        json_type(other)
                    );
                    Criteria::new(vec![Clause::Malformed(other.clone())])
                }
            })
            .collect()
    }

    fn where_clause(&self, source: &Value) -> WhereClause {
        let program = match source {
            Value::String(body) => Program::compile(body, self.limits),
            other => Err(ExprError::NotAString(json_type(other))),
        };
        if let Err(err) = &program {
            log::debug!("$where body {source} will not match: {err}");
        }
        WhereClause { source: source.clone(), program }
    }
}

/// The operator and operand of a comparison object: exactly one key, and that
/// key a recognized operator.
fn single_operator(object: &Map<String, Value>) -> Option<(ComparisonOp, &Value)> {
    let mut entries = object.iter();
    match (entries.next(), entries.next()) {
        (Some((key, operand)), None) => {
            ComparisonOp::from_key(key).map(|op| (op, operand))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: &Value) -> Criteria {
        parse_criteria(value).unwrap()
    }

    fn compare(path: &str, op: ComparisonOp, operand: Value) -> Clause {
        Clause::Compare { path: FieldPath::new(path), op, operand }
    }

    fn equals(path: &str, value: Value) -> Clause {
        Clause::Equals { path: FieldPath::new(path), value }
    }

    #[test]
    fn parse_empty() {
        assert!(parse(&json!({})).is_empty());
    }

    #[test]
    fn parse_literals() {
        let criteria = parse(&json!({"a": 1, "b.c": "x", "d": null, "e": [1, 2]}));
        assert_eq!(
            criteria.clauses,
            vec![
                equals("a", json!(1)),
                equals("b.c", json!("x")),
                equals("d", Value::Null),
                equals("e", json!([1, 2])),
            ]
        );
    }

    #[test]
    fn clauses_keep_written_order() {
        let criteria = parse(&json!({"zzz": 1, "b": 2, "a": 3}));
        assert_eq!(
            criteria.clauses,
            vec![equals("zzz", json!(1)), equals("b", json!(2)), equals("a", json!(3))]
        );
    }

    #[test]
    fn parse_single_operator() {
        let criteria = parse(&json!({"a": {"$gt": 1}}));
        assert_eq!(criteria.clauses, vec![compare("a", ComparisonOp::Gt, json!(1))]);
    }

    #[test]
    fn parse_multi_operator_object() {
        let criteria = parse(&json!({"a": {"$gte": 1, "$lte": 10}}));
        assert_eq!(
            criteria.clauses,
            vec![Clause::Nested(Criteria::new(vec![
                compare("a", ComparisonOp::Gte, json!(1)),
                compare("a", ComparisonOp::Lte, json!(10)),
            ]))]
        );
    }

    #[test]
    fn parse_unrecognized_operator_as_nested() {
        let criteria = parse(&json!({"a": {"$regex": "^x"}}));
        assert_eq!(
            criteria.clauses,
            vec![Clause::Nested(Criteria::new(vec![equals("$regex", json!("^x"))]))]
        );
    }

    #[test]
    fn nested_field_keys_stay_top_level_paths() {
        let criteria = parse(&json!({"a": {"$gt": 0, "b": 2}}));
        assert_eq!(
            criteria.clauses,
            vec![Clause::Nested(Criteria::new(vec![
                compare("a", ComparisonOp::Gt, json!(0)),
                equals("b", json!(2)),
            ]))]
        );
    }

    #[test]
    fn top_level_operator_key_is_a_path() {
        let criteria = parse(&json!({"$gt": 5}));
        assert_eq!(criteria.clauses, vec![equals("$gt", json!(5))]);
    }

    #[test]
    fn parse_combinators() {
        let criteria = parse(&json!({
            "$nor": [],
            "$or": [{"a": 1}, {"b": {"$lt": 2}}],
        }));
        assert_eq!(
            criteria.clauses,
            vec![
                Clause::Nor(vec![]),
                Clause::Or(vec![
                    Criteria::new(vec![equals("a", json!(1))]),
                    Criteria::new(vec![compare("b", ComparisonOp::Lt, json!(2))]),
                ]),
            ]
        );
    }

    #[test]
    fn combinator_without_array_falls_through() {
        let criteria = parse(&json!({"$and": {"a": 1}, "$or": 3}));
        assert_eq!(
            criteria.clauses,
            vec![
                Clause::Nested(Criteria::new(vec![equals("a", json!(1))])),
                equals("$or", json!(3)),
            ]
        );
    }

    #[test]
    fn malformed_combinator_elements() {
        let criteria = parse(&json!({"$and": [{"a": 1}, 5]}));
        assert_eq!(
            criteria.clauses,
            vec![Clause::And(vec![
                Criteria::new(vec![equals("a", json!(1))]),
                Criteria::new(vec![Clause::Malformed(json!(5))]),
            ])]
        );
    }

    #[test]
    fn parse_where() {
        let criteria = parse(&json!({"$where": "a > 2"}));
        let [Clause::Where(clause)] = &criteria.clauses[..] else {
            panic!("expected a single $where clause, got {criteria:?}");
        };
        assert_eq!(clause.source, json!("a > 2"));
        assert_eq!(clause.program.as_ref().map(Program::source), Ok("a > 2"));
    }

    #[test]
    fn parse_where_failures_are_kept() {
        let criteria = parse(&json!({"$where": 5}));
        assert!(matches!(
            &criteria.clauses[..],
            [Clause::Where(WhereClause { program: Err(ExprError::NotAString("number")), .. })]
        ));

        let criteria = parse(&json!({"$where": "a >"}));
        assert!(matches!(
            &criteria.clauses[..],
            [Clause::Where(WhereClause { program: Err(ExprError::Syntax(_)), .. })]
        ));
    }

    #[test]
    fn where_compiles_under_given_limits() {
        let limits = EvalLimits { max_source_len: 3, ..EvalLimits::default() };
        let criteria = parse_criteria_with(&json!({"$where": "a > 2"}), &limits).unwrap();
        assert!(matches!(
            &criteria.clauses[..],
            [Clause::Where(WhereClause {
                program: Err(ExprError::SourceTooLong { len: 5, max: 3 }),
                ..
            })]
        ));
    }

    #[test]
    fn parse_from_text() {
        let criteria = parse_criteria_str(r#"{"a": {"$in": [1, 2]}}"#).unwrap();
        assert_eq!(criteria.clauses, vec![compare("a", ComparisonOp::In, json!([1, 2]))]);
        assert!(matches!(
            parse_criteria_str("{"),
            Err(CriteriaParseError::InvalidJson(_))
        ));
        assert_eq!(
            parse_criteria_str("\"a\""),
            Err(CriteriaParseError::NotAnObject("string"))
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            CriteriaParseError::NotAnObject("array").to_string(),
            "Criteria must be an object, found array"
        );
    }
}
