/*!
# Criteria Evaluation

Recursive evaluation of a [`Criteria`] node against one document, including
the logical combinators.

Evaluation is a pure function of the node and the document. Every clause of
a node must hold, checked in order and stopping at the first that does not.
Combinator lists short-circuit in list order: `$and` at the first non-match,
`$or` and `$nor` at the first match.
*/
use serde_json::Value;

use crate::criteria::ast::{Clause, Criteria, WhereClause};
use crate::criteria::compare::loosely_equal;
use crate::expr::{ExprError, ExpressionEvaluator};
use crate::matcher::MatchObserver;

/// Evaluation context shared by every clause of one match.
#[derive(Clone, Copy)]
pub struct Evaluation<'m> {
    evaluator: &'m dyn ExpressionEvaluator,
    observer: Option<&'m dyn MatchObserver>,
}

impl<'m> Evaluation<'m> {
    /// Construct a context that runs `$where` bodies on `evaluator` and
    /// reports to `observer`, if any.
    #[must_use]
    pub const fn new(
        evaluator: &'m dyn ExpressionEvaluator,
        observer: Option<&'m dyn MatchObserver>,
    ) -> Self {
        Self { evaluator, observer }
    }

    /// Whether every clause of `criteria` holds for `document`.
    #[must_use]
    pub fn matches(&self, criteria: &Criteria, document: &Value) -> bool {
        criteria
            .clauses
            .iter()
            .all(|clause| self.clause(clause, document))
    }

    fn clause(&self, clause: &Clause, document: &Value) -> bool {
        match clause {
            Clause::And(nodes) => self.all_of(nodes, document),
            Clause::Or(nodes) => self.any_of(nodes, document),
            Clause::Nor(nodes) => self.none_of(nodes, document),
            Clause::Where(clause) => self.where_clause(clause, document),
            Clause::Compare { path, op, operand } => {
                op.apply(path.resolve(document), operand)
            }
            Clause::Equals { path, value } => path
                .resolve(document)
                .is_some_and(|resolved| loosely_equal(resolved, value)),
            Clause::Nested(node) => self.matches(node, document),
            Clause::Malformed(_) => false,
        }
    }

    /// `$and`: vacuously true for an empty list.
    fn all_of(&self, nodes: &[Criteria], document: &Value) -> bool {
        nodes.iter().all(|node| self.matches(node, document))
    }

    /// `$or`: vacuously false for an empty list.
    fn any_of(&self, nodes: &[Criteria], document: &Value) -> bool {
        nodes.iter().any(|node| self.matches(node, document))
    }

    /// `$nor`: the negation of `$or` over the same list.
    fn none_of(&self, nodes: &[Criteria], document: &Value) -> bool {
        !self.any_of(nodes, document)
    }

    fn where_clause(&self, clause: &WhereClause, document: &Value) -> bool {
        let result = clause
            .program
            .as_ref()
            .map_err(ExprError::clone)
            .and_then(|program| self.evaluator.evaluate(program, document));

        match result {
            Ok(matched) => matched,
            Err(err) => {
                log::trace!("$where {} failed: {err}", clause.source);
                if let Some(observer) = self.observer {
                    observer.where_failed(&clause.source, &err);
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::parser::parse_criteria;
    use crate::expr::{Program, SandboxEvaluator};
    use serde_json::json;
    use std::sync::Mutex;

    fn matches(document: &Value, criteria: &Value) -> bool {
        let evaluator = SandboxEvaluator::default();
        let criteria = parse_criteria(criteria).unwrap();
        Evaluation::new(&evaluator, None).matches(&criteria, document)
    }

    #[test]
    fn empty_criteria_match_everything() {
        for doc in [json!({}), json!({"a": 1}), json!([1]), json!(null)] {
            assert!(matches(&doc, &json!({})));
        }
    }

    #[test]
    fn implicit_equality() {
        let doc = json!({"a": 1, "b": {"c": "x"}, "n": null, "list": [1, 2]});
        assert!(matches(&doc, &json!({"a": 1})));
        assert!(matches(&doc, &json!({"a": 1.0})));
        assert!(!matches(&doc, &json!({"a": 2})));
        assert!(!matches(&doc, &json!({"a": "1"})));
        assert!(matches(&doc, &json!({"b.c": "x"})));
        assert!(matches(&doc, &json!({"n": null})));
        assert!(matches(&doc, &json!({"list": [1, 2]})));
        assert!(!matches(&doc, &json!({"list": [2, 1]})));
    }

    #[test]
    fn absent_never_equals() {
        let doc = json!({"a": {"b": 2}});
        assert!(!matches(&doc, &json!({"a.c": 2})));
        assert!(!matches(&doc, &json!({"missing": null})));
    }

    #[test]
    fn every_key_must_hold() {
        let doc = json!({"a": 1, "b": 2});
        assert!(matches(&doc, &json!({"a": 1, "b": 2})));
        assert!(!matches(&doc, &json!({"a": 1, "b": 3})));
    }

    #[test]
    fn range_object() {
        let criteria = json!({"a": {"$gte": 1, "$lte": 10}});
        assert!(matches(&json!({"a": 5}), &criteria));
        assert!(matches(&json!({"a": 10}), &criteria));
        assert!(!matches(&json!({"a": 11}), &criteria));
        assert!(!matches(&json!({}), &criteria));
    }

    #[test]
    fn unrecognized_operator_is_nested_and() {
        // `$regex` is not an operator, so this is equality at path "$regex"
        assert!(!matches(&json!({"a": "x"}), &json!({"a": {"$regex": "x"}})));
        assert!(matches(
            &json!({"a": "x", "$regex": "x"}),
            &json!({"a": {"$regex": "x"}})
        ));
    }

    #[test]
    fn nested_node_resolves_against_whole_document() {
        let doc = json!({"a": {"b": 1}, "b": 2});
        // `b` inside the object is the top-level `b`, not `a.b`
        assert!(matches(&doc, &json!({"a": {"b": 2, "c": {"$exists": false}}})));
        assert!(!matches(&doc, &json!({"a": {"b": 1, "c": {"$exists": false}}})));
    }

    #[test]
    fn empty_object_value_is_vacuous() {
        assert!(matches(&json!({}), &json!({"a": {}})));
    }

    #[test]
    fn combinators_on_empty_lists() {
        let doc = json!({"a": 1});
        assert!(matches(&doc, &json!({"$and": []})));
        assert!(!matches(&doc, &json!({"$or": []})));
        assert!(matches(&doc, &json!({"$nor": []})));
    }

    #[test]
    fn combinators() {
        let doc = json!({"a": 1, "b": 2});
        assert!(matches(&doc, &json!({"$and": [{"a": 1}, {"b": 2}]})));
        assert!(!matches(&doc, &json!({"$and": [{"a": 1}, {"b": 3}]})));
        assert!(matches(&doc, &json!({"$or": [{"a": 9}, {"b": 2}]})));
        assert!(!matches(&doc, &json!({"$or": [{"a": 9}, {"b": 9}]})));
        assert!(matches(&doc, &json!({"$nor": [{"a": 9}, {"b": 9}]})));
        assert!(!matches(&doc, &json!({"$nor": [{"a": 9}, {"b": 2}]})));
    }

    #[test]
    fn nested_combinators() {
        let doc = json!({"age": 40, "role": "admin", "active": false});
        let criteria = json!({
            "$or": [
                {"$and": [{"age": {"$gt": 30}}, {"active": true}]},
                {"$nor": [{"role": {"$ne": "admin"}}]},
            ]
        });
        assert!(matches(&doc, &criteria));
    }

    #[test]
    fn malformed_elements_never_match() {
        let doc = json!({"a": 1});
        assert!(!matches(&doc, &json!({"$or": [5, "x", null]})));
        assert!(matches(&doc, &json!({"$or": [5, {"a": 1}]})));
        assert!(matches(&doc, &json!({"$nor": [5]})));
    }

    #[test]
    fn where_clause() {
        assert!(matches(&json!({"a": 3}), &json!({"$where": "a > 2"})));
        assert!(!matches(&json!({"a": 1}), &json!({"$where": "a > 2"})));
        assert!(!matches(&json!({"a": 3}), &json!({"$where": "b.c > 2"})));
        assert!(!matches(&json!({"a": 3}), &json!({"$where": "a >"})));
        assert!(!matches(&json!({"a": 3}), &json!({"$where": true})));
    }

    #[test]
    fn where_combined_with_fields() {
        let criteria = json!({"kind": "box", "$where": "w * h > 10"});
        assert!(matches(&json!({"kind": "box", "w": 3, "h": 4}), &criteria));
        assert!(!matches(&json!({"kind": "box", "w": 1, "h": 4}), &criteria));
        assert!(!matches(&json!({"kind": "bag", "w": 3, "h": 4}), &criteria));
    }

    #[test]
    fn and_short_circuits_in_list_order() {
        struct Counting(Mutex<usize>);
        impl ExpressionEvaluator for Counting {
            fn evaluate(&self, _: &Program, _: &Value) -> Result<bool, ExprError> {
                *self.0.lock().unwrap() += 1;
                Ok(true)
            }
        }

        let evaluator = Counting(Mutex::new(0));
        let criteria = parse_criteria(&json!({
            "$and": [{"a": 2}, {"$where": "true"}]
        }))
        .unwrap();
        let evaluation = Evaluation::new(&evaluator, None);
        assert!(!evaluation.matches(&criteria, &json!({"a": 1})));
        assert_eq!(*evaluator.0.lock().unwrap(), 0);

        let criteria = parse_criteria(&json!({
            "$or": [{"a": 1}, {"$where": "true"}]
        }))
        .unwrap();
        assert!(evaluation.matches(&criteria, &json!({"a": 1})));
        assert_eq!(*evaluator.0.lock().unwrap(), 0);

        let criteria = parse_criteria(&json!({
            "$nor": [{"a": 1}, {"$where": "true"}]
        }))
        .unwrap();
        assert!(!evaluation.matches(&criteria, &json!({"a": 1})));
        assert_eq!(*evaluator.0.lock().unwrap(), 0);
    }

    #[test]
    fn node_stops_at_first_failing_key() {
        struct Recorder(Mutex<Vec<String>>);
        impl MatchObserver for Recorder {
            fn where_failed(&self, source: &Value, _: &ExprError) {
                self.0.lock().unwrap().push(source.to_string());
            }
        }

        let evaluator = SandboxEvaluator::default();
        let recorder = Recorder(Mutex::new(vec![]));
        let evaluation = Evaluation::new(&evaluator, Some(&recorder));

        // `zzz` is written first, so the `$where` after it never runs
        let criteria = parse_criteria(&json!({"zzz": 1, "$where": "nope > 1"})).unwrap();
        assert!(!evaluation.matches(&criteria, &json!({"zzz": 2})));
        assert!(recorder.0.lock().unwrap().is_empty());

        let criteria = parse_criteria(&json!({"$where": "nope > 1", "zzz": 1})).unwrap();
        assert!(!evaluation.matches(&criteria, &json!({"zzz": 2})));
        assert_eq!(recorder.0.into_inner().unwrap(), vec![r#""nope > 1""#.to_string()]);
    }

    #[test]
    fn where_failures_reach_observer() {
        struct Recorder(Mutex<Vec<String>>);
        impl MatchObserver for Recorder {
            fn where_failed(&self, source: &Value, error: &ExprError) {
                self.0.lock().unwrap().push(format!("{source}: {error}"));
            }
        }

        let evaluator = SandboxEvaluator::default();
        let recorder = Recorder(Mutex::new(vec![]));
        let criteria = parse_criteria(&json!({"$where": "nope > 1"})).unwrap();
        let evaluation = Evaluation::new(&evaluator, Some(&recorder));

        assert!(!evaluation.matches(&criteria, &json!({"a": 1})));
        assert_eq!(
            recorder.0.into_inner().unwrap(),
            vec![r#""nope > 1": Unbound identifier: nope"#.to_string()]
        );
    }
}
