/*!
# `mongrep` Library

MongoDB-style query predicates over in-memory JSON documents.

Criteria are JSON objects: field paths mapped to literals (implicit
equality) or to comparison operators (`$exists`, `$lt`, `$lte`, `$gt`,
`$gte`, `$ne`, `$in`, `$nin`), combined with `$and`, `$or`, and `$nor`, and
optionally a sandboxed `$where` expression over the document's fields.

```
use mongrep::{find, match_document};
use serde_json::json;

let people = vec![
    json!({"name": "Ada", "age": 36, "address": {"city": "London"}}),
    json!({"name": "Alan", "age": 41, "address": {"city": "Wilmslow"}}),
];

assert!(match_document(&people[0], &json!({"address.city": "London"})));

let found = find(&people, &json!({
    "$or": [{"age": {"$gt": 40}}, {"$where": "name.length < 3"}]
}));
assert_eq!(found, vec![&people[1]]);
```
*/

pub mod criteria;
pub mod expr;
pub mod formats;
pub mod matcher;
pub mod path;
pub mod utils;

pub use criteria::{Criteria, CriteriaBuilder, CriteriaParseError};
pub use expr::{EvalLimits, ExprError, ExpressionEvaluator, SandboxEvaluator};
pub use matcher::{LogObserver, MatchObserver, Matcher, find, match_document};
pub use path::FieldPath;
