//! Filter and query option types for document store operations
//!
//! A [`Filter`] is a conjunction of [`FilterCondition`]s plus at most one
//! OR-group. Conditions carry typed [`FilterValue`]s, so a store backend never
//! has to guess how to compare a date against a string.
//!
//! # Example
//!
//! ```rust
//! use crud_mapper::store::{Filter, FilterCondition};
//!
//! let mut filter = Filter::new();
//! filter.push(FilterCondition::eq("status", "active"));
//! filter.push(FilterCondition::ne("deleted", true));
//! assert_eq!(filter.conditions().len(), 2);
//! assert!(!filter.is_empty());
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Direction for ordering results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9, oldest first).
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0, newest first).
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// Comparison operators usable in filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// Equal to.
    Equal,
    /// Not equal to. Matches documents where the field is absent.
    NotEqual,
    /// Greater than.
    GreaterThan,
    /// Greater than or equal to.
    GreaterThanOrEqual,
    /// Less than.
    LessThan,
    /// Less than or equal to.
    LessThanOrEqual,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
        }
    }
}

/// A typed value usable in filter conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Native temporal value, compared chronologically.
    DateTime(DateTime<Utc>),
    /// Null value.
    Null,
}

impl FilterValue {
    /// Convert a scalar JSON value into a filter value.
    ///
    /// Arrays and objects have no scalar filter representation and yield
    /// `None`.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::Bool(b) => Some(Self::Boolean(*b)),
            Value::Null => Some(Self::Null),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for FilterValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }
}

/// A single condition on one document field.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The field name the condition applies to.
    pub field: String,
    /// The comparison operator.
    pub operator: FilterOperator,
    /// The value to compare against.
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a condition with an explicit operator.
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Equality condition (field = value).
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// Inequality condition (field != value, matching absent fields).
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// Greater-than condition.
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// Greater-than-or-equal condition.
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// Less-than condition.
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// Less-than-or-equal condition.
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }
}

/// A storage-level predicate: a conjunction of conditions, optionally
/// combined with one OR-group.
///
/// A document matches when every condition in the conjunction holds and, if
/// the OR-group is non-empty, at least one of its conditions holds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    conditions: Vec<FilterCondition>,
    any_of: Vec<FilterCondition>,
}

impl Filter {
    /// Create an empty filter, matching every document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition to the conjunction.
    pub fn push(&mut self, condition: FilterCondition) {
        self.conditions.push(condition);
    }

    /// Add a condition to the conjunction, builder style.
    #[must_use]
    pub fn and(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the OR-group: at least one of these conditions must hold.
    #[must_use]
    pub fn any_of(mut self, conditions: Vec<FilterCondition>) -> Self {
        self.any_of = conditions;
        self
    }

    /// Conditions in the conjunction.
    #[must_use]
    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    /// Conditions in the OR-group.
    #[must_use]
    pub fn or_conditions(&self) -> &[FilterCondition] {
        &self.any_of
    }

    /// Whether the filter has no conditions at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.any_of.is_empty()
    }

    /// Whether any condition (conjunction or OR-group) targets the field.
    #[must_use]
    pub fn references(&self, field: &str) -> bool {
        self.conditions.iter().any(|c| c.field == field)
            || self.any_of.iter().any(|c| c.field == field)
    }

    /// Remove every conjunction condition targeting the field.
    pub fn remove(&mut self, field: &str) {
        self.conditions.retain(|c| c.field != field);
    }
}

/// A single denormalization step: embed documents from another collection.
///
/// For each result document, every document in `from` whose `foreign_field`
/// equals the result's `local_field` is embedded as an array under `as_field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSpec {
    /// Collection to pull embedded documents from.
    pub from: String,
    /// Field on the result document to join on.
    pub local_field: String,
    /// Field on the foreign document to join on.
    pub foreign_field: String,
    /// Field name the embedded array is stored under.
    pub as_field: String,
}

/// Options applied to a [`find`](super::DocumentStore::find) call.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Field names to project; empty means all fields.
    pub projection: Vec<String>,
    /// Optional (field, direction) sort.
    pub sort: Option<(String, OrderDirection)>,
    /// Number of matching documents to skip.
    pub skip: u64,
    /// Maximum number of documents to return; `None` means unbounded.
    pub limit: Option<u64>,
    /// Optional denormalization step applied before projection.
    pub lookup: Option<LookupSpec>,
}
