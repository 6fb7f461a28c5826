/*!
# Matcher API

Public entry points for testing documents against criteria.

A [`Matcher`] holds parsed criteria together with the `$where` evaluator and
an optional [`MatchObserver`]. It never fails once constructed: every
document either matches or it does not.

```
use mongrep::matcher::Matcher;
use serde_json::json;

let matcher = Matcher::new(&json!({"a": {"$gt": 1}})).unwrap();
let docs = vec![json!({"a": 1}), json!({"a": 2}), json!({"a": 3})];
assert_eq!(matcher.find(&docs), vec![&json!({"a": 2}), &json!({"a": 3})]);
```

For one-off checks, [`match_document`] and [`find`] parse the criteria on
every call and treat criteria that are not an object as matching nothing.
*/
use serde_json::Value;

use crate::criteria::{
    Criteria, CriteriaParseError, Evaluation, parser::parse_criteria_with,
};
use crate::expr::{EvalLimits, ExprError, ExpressionEvaluator, SandboxEvaluator};

/// Hooks for observing evaluation. Every method defaults to doing nothing.
pub trait MatchObserver: Send + Sync {
    /// A `$where` clause failed to compile or evaluate and was treated as a
    /// non-match.
    fn where_failed(&self, _source: &Value, _error: &ExprError) {}

    /// A document was evaluated. `index` is its position in the collection
    /// for [`Matcher::find`] and [`Matcher::filter`], and `None` for
    /// [`Matcher::matches`].
    fn document_evaluated(&self, _index: Option<usize>, _matched: bool) {}
}

/// An observer that forwards to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl MatchObserver for LogObserver {
    fn where_failed(&self, source: &Value, error: &ExprError) {
        log::warn!("$where {source} did not evaluate: {error}");
    }

    fn document_evaluated(&self, index: Option<usize>, matched: bool) {
        match index {
            Some(i) => log::trace!("document #{i}: matched={matched}"),
            None => log::trace!("document: matched={matched}"),
        }
    }
}

/// Parsed criteria ready to be evaluated against documents.
pub struct Matcher {
    criteria: Criteria,
    evaluator: Box<dyn ExpressionEvaluator>,
    observer: Option<Box<dyn MatchObserver>>,
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("criteria", &self.criteria)
            .field("observed", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl From<Criteria> for Matcher {
    fn from(criteria: Criteria) -> Self {
        Self {
            criteria,
            evaluator: Box::new(SandboxEvaluator::default()),
            observer: None,
        }
    }
}

impl Matcher {
    /// Parse `criteria` with default `$where` limits.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaParseError::NotAnObject`] if `criteria` is not an
    /// object.
    pub fn new(criteria: &Value) -> Result<Self, CriteriaParseError> {
        Self::with_limits(criteria, EvalLimits::default())
    }

    /// Parse `criteria`, compiling and evaluating `$where` bodies under
    /// `limits`.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaParseError::NotAnObject`] if `criteria` is not an
    /// object.
    pub fn with_limits(
        criteria: &Value,
        limits: EvalLimits,
    ) -> Result<Self, CriteriaParseError> {
        let criteria = parse_criteria_with(criteria, &limits)?;
        log::debug!(
            "Parsed criteria: {} top-level clause(s), depth {}",
            criteria.clauses.len(),
            criteria.depth()
        );
        Ok(Self::from(criteria).with_evaluator(SandboxEvaluator::new(limits)))
    }

    /// Replace the `$where` evaluator.
    #[must_use]
    pub fn with_evaluator<E: ExpressionEvaluator + 'static>(mut self, evaluator: E) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Attach an observer.
    #[must_use]
    pub fn with_observer<O: MatchObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// The parsed criteria.
    #[must_use]
    pub const fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    fn evaluation(&self) -> Evaluation<'_> {
        Evaluation::new(self.evaluator.as_ref(), self.observer.as_deref())
    }

    fn evaluate(&self, document: &Value, index: Option<usize>) -> bool {
        let matched = self.evaluation().matches(&self.criteria, document);
        if let Some(observer) = &self.observer {
            observer.document_evaluated(index, matched);
        }
        matched
    }

    /// Whether `document` satisfies the criteria.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        self.evaluate(document, None)
    }

    /// The documents that satisfy the criteria, in their original order.
    #[must_use]
    pub fn find<'a>(&self, documents: &'a [Value]) -> Vec<&'a Value> {
        self.find_indexed(documents)
            .into_iter()
            .map(|(_, doc)| doc)
            .collect()
    }

    /// Like [`Matcher::find`], paired with each document's position in
    /// `documents`.
    #[must_use]
    pub fn find_indexed<'a>(&self, documents: &'a [Value]) -> Vec<(usize, &'a Value)> {
        documents
            .iter()
            .enumerate()
            .filter(|(i, doc)| self.evaluate(doc, Some(*i)))
            .collect()
    }

    /// Owned variant of [`Matcher::find`]: keeps the documents that satisfy
    /// the criteria, in their original order.
    #[must_use]
    pub fn filter<I>(&self, documents: I) -> Vec<Value>
    where
        I: IntoIterator<Item = Value>,
    {
        documents
            .into_iter()
            .enumerate()
            .filter(|(i, doc)| self.evaluate(doc, Some(*i)))
            .map(|(_, doc)| doc)
            .collect()
    }
}

/// Whether `document` satisfies `criteria`. Criteria that are not an object
/// match nothing.
#[must_use]
pub fn match_document(document: &Value, criteria: &Value) -> bool {
    match Matcher::new(criteria) {
        Ok(matcher) => matcher.matches(document),
        Err(err) => {
            log::warn!("{err}; no document can match");
            false
        }
    }
}

/// The documents that satisfy `criteria`, in their original order. Criteria
/// that are not an object match nothing.
#[must_use]
pub fn find<'a>(documents: &'a [Value], criteria: &Value) -> Vec<&'a Value> {
    match Matcher::new(criteria) {
        Ok(matcher) => matcher.find(documents),
        Err(err) => {
            log::warn!("{err}; no document can match");
            vec![]
        }
    }
}
