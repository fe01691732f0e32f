//! Exact-match metadata filters for vector queries and deletes.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

/// Conjunction of exact-match constraints on metadata fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: BTreeMap<String, Value>,
}

impl MetadataFilter {
    /// Filter with no constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to vectors whose `source` equals `path`.
    pub fn source(path: impl Into<String>) -> Self {
        Self::new().eq("source", Value::String(path.into()))
    }

    /// Add an exact-match constraint on `key`.
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(key.into(), value.into());
        self
    }

    /// Whether the filter has no constraints.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render the filter in the index service's query language.
    ///
    /// Multiple top-level fields are combined with an implicit AND by the service.
    pub fn to_query_value(&self) -> Value {
        let mut clauses = Map::new();
        for (key, value) in &self.conditions {
            clauses.insert(key.clone(), json!({ "$eq": value }));
        }
        Value::Object(clauses)
    }

    /// Evaluate the filter against stored metadata.
    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|(key, expected)| {
            metadata
                .get(key)
                .is_some_and(|actual| values_equal(actual, expected))
        })
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => actual == expected,
    }
}
