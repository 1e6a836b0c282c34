//! In-memory document store backend
//!
//! [`MemoryBackend`] holds named collections behind a shared lock;
//! [`MemoryCollection`] implements [`DocumentStore`] against one of them.
//! Mutating operations take the write lock for their whole find-plus-mutate
//! step, which gives the atomicity the trait contract asks for.
//!
//! This backend doubles as the crate's test store and as a reference for how
//! filter semantics are meant to behave, in particular that a `!=` condition
//! matches documents where the field is absent, and that equality against an
//! array field is containment (the condition value equal to any element).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::error::{StorageError, StoreOperation, StoreResult};
use super::filter::{Filter, FilterCondition, FilterOperator, FilterValue, FindOptions, LookupSpec, OrderDirection};
use super::traits::{Document, DocumentStore, UpdateDocument};

/// Shared in-memory database of named collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a handle to the named collection, creating it lazily on first
    /// write.
    #[must_use]
    pub fn collection(&self, name: impl Into<String>) -> MemoryCollection {
        MemoryCollection {
            name: name.into(),
            backend: self.clone(),
        }
    }

    fn read(
        &self,
        operation: StoreOperation,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections
            .read()
            .map_err(|_| StorageError::new(operation, "store lock poisoned"))
    }

    fn write(
        &self,
        operation: StoreOperation,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections
            .write()
            .map_err(|_| StorageError::new(operation, "store lock poisoned"))
    }
}

/// One named collection in a [`MemoryBackend`].
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    name: String,
    backend: MemoryBackend,
}

impl MemoryCollection {
    /// The collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn condition_matches(document: &Document, condition: &FilterCondition) -> bool {
    let field_value = document.get(&condition.field);
    match condition.operator {
        FilterOperator::Equal => {
            field_value.is_some_and(|v| values_equal(v, &condition.value))
        }
        // Absent fields satisfy a not-equal condition.
        FilterOperator::NotEqual => {
            field_value.is_none_or(|v| !values_equal(v, &condition.value))
        }
        FilterOperator::GreaterThan => {
            ordered(field_value, &condition.value).is_some_and(Ordering::is_gt)
        }
        FilterOperator::GreaterThanOrEqual => {
            ordered(field_value, &condition.value).is_some_and(Ordering::is_ge)
        }
        FilterOperator::LessThan => {
            ordered(field_value, &condition.value).is_some_and(Ordering::is_lt)
        }
        FilterOperator::LessThanOrEqual => {
            ordered(field_value, &condition.value).is_some_and(Ordering::is_le)
        }
    }
}

fn values_equal(document_value: &Value, filter_value: &FilterValue) -> bool {
    // An array field matches on containment: equality against any element.
    if let Value::Array(elements) = document_value {
        return elements.iter().any(|element| scalar_equal(element, filter_value));
    }
    scalar_equal(document_value, filter_value)
}

fn scalar_equal(document_value: &Value, filter_value: &FilterValue) -> bool {
    match filter_value {
        FilterValue::String(s) => document_value.as_str() == Some(s.as_str()),
        FilterValue::Number(n) => document_value.as_f64() == Some(*n),
        FilterValue::Boolean(b) => document_value.as_bool() == Some(*b),
        FilterValue::DateTime(dt) => parse_instant(document_value) == Some(*dt),
        FilterValue::Null => document_value.is_null(),
    }
}

fn ordered(document_value: Option<&Value>, filter_value: &FilterValue) -> Option<Ordering> {
    let document_value = document_value?;
    match filter_value {
        FilterValue::String(s) => document_value.as_str().map(|v| v.cmp(s.as_str())),
        FilterValue::Number(n) => document_value.as_f64().and_then(|v| v.partial_cmp(n)),
        FilterValue::DateTime(dt) => parse_instant(document_value).map(|v| v.cmp(dt)),
        FilterValue::Boolean(_) | FilterValue::Null => None,
    }
}

fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn matches(document: &Document, filter: &Filter) -> bool {
    if !filter
        .conditions()
        .iter()
        .all(|condition| condition_matches(document, condition))
    {
        return false;
    }
    filter.or_conditions().is_empty()
        || filter
            .or_conditions()
            .iter()
            .any(|condition| condition_matches(document, condition))
}

/// Total ordering over JSON values for sorting: null < bool < number <
/// string < array < object, with missing fields first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

fn apply_lookup(
    collections: &HashMap<String, Vec<Document>>,
    document: &mut Document,
    lookup: &LookupSpec,
) {
    let local = document.get(&lookup.local_field).cloned();
    let embedded: Vec<Value> = collections
        .get(&lookup.from)
        .map(|foreign| {
            foreign
                .iter()
                .filter(|doc| doc.get(&lookup.foreign_field) == local.as_ref())
                .map(|doc| Value::Object(doc.clone()))
                .collect()
        })
        .unwrap_or_default();
    document.insert(lookup.as_field.clone(), Value::Array(embedded));
}

fn project(document: Document, projection: &[String]) -> Document {
    if projection.is_empty() {
        return document;
    }
    let mut projected = Document::new();
    // The identifier field always survives projection.
    if let Some(id) = document.get("_id") {
        projected.insert("_id".to_string(), id.clone());
    }
    for field in projection {
        if let Some(value) = document.get(field) {
            projected.insert(field.clone(), value.clone());
        }
    }
    projected
}

impl DocumentStore for MemoryCollection {
    async fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<Document>> {
        let collections = self.backend.read(StoreOperation::Find)?;
        let mut results: Vec<Document> = collections
            .get(&self.name)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).cloned().collect())
            .unwrap_or_default();

        if let Some((field, direction)) = &options.sort {
            results.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match direction {
                    OrderDirection::Ascending => ordering,
                    OrderDirection::Descending => ordering.reverse(),
                }
            });
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let mut window: Vec<Document> = match options.limit {
            Some(limit) => {
                let limit = usize::try_from(limit).unwrap_or(usize::MAX);
                results.into_iter().skip(skip).take(limit).collect()
            }
            None => results.into_iter().skip(skip).collect(),
        };

        if let Some(lookup) = &options.lookup {
            for document in &mut window {
                apply_lookup(&collections, document, lookup);
            }
        }

        Ok(window
            .into_iter()
            .map(|doc| project(doc, &options.projection))
            .collect())
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        let collections = self.backend.read(StoreOperation::Count)?;
        let count = collections
            .get(&self.name)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).count())
            .unwrap_or_default();
        Ok(count as u64)
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
        let collections = self.backend.read(StoreOperation::FindOne)?;
        Ok(collections
            .get(&self.name)
            .and_then(|docs| docs.iter().find(|d| matches(d, filter)).cloned()))
    }

    async fn insert(&self, document: Document) -> StoreResult<()> {
        let mut collections = self.backend.write(StoreOperation::Insert)?;
        collections.entry(self.name.clone()).or_default().push(document);
        Ok(())
    }

    async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: UpdateDocument,
    ) -> StoreResult<Option<Document>> {
        let mut collections = self.backend.write(StoreOperation::FindOneAndUpdate)?;
        let Some(docs) = collections.get_mut(&self.name) else {
            return Ok(None);
        };
        let Some(document) = docs.iter_mut().find(|d| matches(d, filter)) else {
            return Ok(None);
        };
        for (field, value) in update.set {
            document.insert(field, value);
        }
        for field in &update.unset {
            document.remove(field);
        }
        Ok(Some(document.clone()))
    }

    async fn find_one_and_delete(&self, filter: &Filter) -> StoreResult<bool> {
        let mut collections = self.backend.write(StoreOperation::FindOneAndDelete)?;
        let Some(docs) = collections.get_mut(&self.name) else {
            return Ok(false);
        };
        match docs.iter().position(|d| matches(d, filter)) {
            Some(index) => {
                docs.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
