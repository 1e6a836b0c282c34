//! Uniqueness clause construction and collision reporting
//!
//! The mapper's uniqueness check is split into two pure steps so the logic is
//! testable without a store: [`unique_clauses`] turns the unique keys present
//! in a payload into an OR-group of equality conditions, and
//! [`colliding_keys`] names the keys that actually collide once the matching
//! documents come back. The store query itself lives in the mapper.

use std::fmt;

use serde_json::Value;

use crate::schema::Schema;
use crate::store::{Document, FilterCondition, FilterValue};

/// Payload collides with an existing active record on declared-unique fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicationError {
    /// Distinct colliding field names, in schema declaration order.
    pub keys: Vec<String>,
}

impl fmt::Display for DuplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate value for unique field(s): {}", self.keys.join(", "))
    }
}

impl std::error::Error for DuplicationError {}

/// Build the OR-group of equality conditions for the unique keys present in
/// the payload.
///
/// Scalar values produce one condition; array values produce one condition
/// per element. Keys absent from the payload contribute nothing, so an empty
/// result means the check passes trivially.
#[must_use]
pub fn unique_clauses(schema: &Schema, data: &Document) -> Vec<FilterCondition> {
    let mut clauses = Vec::new();
    for key in schema.unique() {
        match data.get(key) {
            Some(Value::Array(elements)) => {
                for element in elements {
                    if let Some(value) = FilterValue::from_json(element) {
                        clauses.push(FilterCondition::eq(key.clone(), value));
                    }
                }
            }
            Some(value) => {
                if let Some(value) = FilterValue::from_json(value) {
                    clauses.push(FilterCondition::eq(key.clone(), value));
                }
            }
            None => {}
        }
    }
    clauses
}

/// Compute the distinct unique-key names on which the payload collides with
/// any of the matched documents.
///
/// Scalar keys collide on equal values; array keys collide on any shared
/// element. Every match contributes, and the result is deduplicated.
#[must_use]
pub fn colliding_keys(schema: &Schema, data: &Document, matches: &[Document]) -> Vec<String> {
    let mut keys = Vec::new();
    for matched in matches {
        for key in schema.unique() {
            let (Some(candidate), Some(existing)) = (data.get(key), matched.get(key)) else {
                continue;
            };
            let collides = match (candidate, existing) {
                (Value::Array(candidate), Value::Array(existing)) => candidate
                    .iter()
                    .any(|value| existing.iter().any(|other| other == value)),
                (candidate, existing) => candidate == existing,
            };
            if collides && !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, Schema};
    use crate::store::FilterValue;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other:?}"),
        }
    }

    fn schema() -> Schema {
        Schema::builder("account")
            .property("email", FieldSpec::string())
            .property("aliases", FieldSpec::array(FieldSpec::string()))
            .property("name", FieldSpec::string())
            .unique(["email", "aliases"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_scalar_key_yields_one_clause() {
        let clauses = unique_clauses(&schema(), &doc(json!({"email": "a@b.c"})));
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].field, "email");
        assert_eq!(clauses[0].value, FilterValue::String("a@b.c".to_string()));
    }

    #[test]
    fn test_array_key_yields_one_clause_per_element() {
        let clauses = unique_clauses(&schema(), &doc(json!({"aliases": ["x", "y", "z"]})));
        assert_eq!(clauses.len(), 3);
        assert!(clauses.iter().all(|c| c.field == "aliases"));
    }

    #[test]
    fn test_absent_keys_yield_no_clauses() {
        let clauses = unique_clauses(&schema(), &doc(json!({"name": "no unique keys here"})));
        assert!(clauses.is_empty());
    }

    #[test]
    fn test_scalar_collision_named() {
        let data = doc(json!({"email": "a@b.c"}));
        let matches = vec![doc(json!({"email": "a@b.c", "name": "other"}))];
        assert_eq!(colliding_keys(&schema(), &data, &matches), vec!["email"]);
    }

    #[test]
    fn test_array_collision_on_shared_element() {
        let data = doc(json!({"aliases": ["x", "q"]}));
        let matches = vec![doc(json!({"aliases": ["y", "x"]}))];
        assert_eq!(colliding_keys(&schema(), &data, &matches), vec!["aliases"]);
    }

    #[test]
    fn test_no_collision_when_values_differ() {
        let data = doc(json!({"email": "a@b.c", "aliases": ["x"]}));
        let matches = vec![doc(json!({"email": "d@e.f", "aliases": ["y"]}))];
        assert!(colliding_keys(&schema(), &data, &matches).is_empty());
    }

    #[test]
    fn test_all_matches_enumerated_and_deduplicated() {
        let data = doc(json!({"email": "a@b.c", "aliases": ["x"]}));
        let matches = vec![
            doc(json!({"email": "a@b.c"})),
            doc(json!({"email": "a@b.c", "aliases": ["x"]})),
        ];
        // email collides in both matches but is reported once; aliases only
        // collides in the second match.
        assert_eq!(
            colliding_keys(&schema(), &data, &matches),
            vec!["email", "aliases"]
        );
    }
}
