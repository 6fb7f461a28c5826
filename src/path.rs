/*!
# Field Paths

Dot-separated addresses into nested documents, e.g. `"address.city"`.

A path is split into segments once, when the criteria are parsed, and is then
resolved against each document by successive key lookups. Resolution
short-circuits to "absent" (`None`) on the first segment that is missing or
whose parent is not an object.

```
use mongrep::path::FieldPath;
use serde_json::json;

let doc = json!({"a": {"b": 2}});
let path = FieldPath::new("a.b");
assert_eq!(path.resolve(&doc), Some(&json!(2)));
assert_eq!(FieldPath::new("a.c").resolve(&doc), None);
```
*/
use serde_json::Value;
use std::{fmt::Display, str::FromStr};

/// A pre-split, dot-separated field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    /// The path as it was written in the criteria
    raw: String,
    /// The individual keys, in lookup order
    segments: Vec<String>,
}

impl FieldPath {
    /// Construct a path from its dotted representation. Every string is a
    /// valid path; an empty string addresses the key `""`.
    pub fn new<T: Into<String>>(raw: T) -> Self {
        let raw = raw.into();
        let segments = raw.split('.').map(str::to_string).collect();
        Self { raw, segments }
    }

    /// The path as originally written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The keys walked during resolution.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolve this path against a document, returning `None` when the path
    /// is absent.
    #[must_use]
    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(document, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                _ => None,
            })
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for FieldPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FieldPath {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
