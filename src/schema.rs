//! Typed schema descriptors for mapper construction
//!
//! A [`Schema`] declares the shape of a resource up front: its field types,
//! which fields are mandatory on create, which must be unique across active
//! records, and which may be used as query filters. The descriptor is checked
//! when it is built, so a mapper never has to inspect untyped property bags at
//! request time.
//!
//! # Example
//!
//! ```rust
//! use crud_mapper::schema::{FieldSpec, Schema};
//!
//! let schema = Schema::builder("user")
//!     .property("name", FieldSpec::string())
//!     .property("email", FieldSpec::string())
//!     .property("lastLogin", FieldSpec::date_time())
//!     .required(["name", "email"])
//!     .unique(["email"])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.collection(), "user");
//! // searchable defaults to every declared property
//! assert!(schema.searchable().contains(&"email".to_string()));
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

/// Default field targeted by the `after`/`before`/`between` range operators.
pub const DEFAULT_DATE_FIELD: &str = "updatedAt";

/// The type of a single schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// UTF-8 text.
    String,
    /// JSON number (integer or float).
    Number,
    /// Boolean.
    Boolean,
    /// An instant in time, carried as RFC 3339 text in documents and
    /// normalized to UTC by the validator wherever it appears.
    DateTime,
    /// Homogeneous array of the given element spec.
    Array(Box<FieldSpec>),
    /// Nested object with its own property map.
    Object(BTreeMap<String, FieldSpec>),
}

/// Constraint descriptor for one schema field: a type plus nullability.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// The declared type of the field.
    pub field_type: FieldType,
    /// Whether `null` is accepted in place of a typed value.
    pub nullable: bool,
}

impl FieldSpec {
    /// Create a spec with the given type, not nullable.
    #[must_use]
    pub const fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            nullable: false,
        }
    }

    /// Shorthand for a string field.
    #[must_use]
    pub const fn string() -> Self {
        Self::new(FieldType::String)
    }

    /// Shorthand for a numeric field.
    #[must_use]
    pub const fn number() -> Self {
        Self::new(FieldType::Number)
    }

    /// Shorthand for a boolean field.
    #[must_use]
    pub const fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    /// Shorthand for a date-time field.
    #[must_use]
    pub const fn date_time() -> Self {
        Self::new(FieldType::DateTime)
    }

    /// Shorthand for an array field with the given element spec.
    #[must_use]
    pub fn array(element: FieldSpec) -> Self {
        Self::new(FieldType::Array(Box::new(element)))
    }

    /// Shorthand for a nested object field.
    #[must_use]
    pub fn object(properties: impl IntoIterator<Item = (&'static str, FieldSpec)>) -> Self {
        Self::new(FieldType::Object(
            properties
                .into_iter()
                .map(|(name, spec)| (name.to_string(), spec))
                .collect(),
        ))
    }

    /// Mark the field as accepting `null`.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Error raised when a schema descriptor is internally inconsistent.
///
/// These are construction-time programming errors, not request-time failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The schema declares no properties at all.
    #[error("schema `{0}` declares no properties")]
    Empty(String),
    /// A `required` entry does not name a declared property.
    #[error("required field `{0}` is not a declared property")]
    UnknownRequired(String),
    /// A `unique` entry does not name a declared property.
    #[error("unique field `{0}` is not a declared property")]
    UnknownUnique(String),
    /// A `searchable` entry does not name a declared property.
    #[error("searchable field `{0}` is not a declared property")]
    UnknownSearchable(String),
}

/// An immutable, validated resource schema.
///
/// Built via [`Schema::builder`]. Once constructed the descriptor never
/// changes; the validator injects the soft-delete field descriptors into its
/// own working copy, not into this one.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    collection: String,
    properties: BTreeMap<String, FieldSpec>,
    required: Vec<String>,
    unique: Vec<String>,
    searchable: Vec<String>,
    date_field: String,
}

impl Schema {
    /// Start building a schema for the named resource.
    ///
    /// The collection name defaults to the resource name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            collection: None,
            properties: BTreeMap::new(),
            required: Vec::new(),
            unique: Vec::new(),
            searchable: None,
            date_field: DEFAULT_DATE_FIELD.to_string(),
        }
    }

    /// The resource name (used for route and embed naming).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The storage collection this schema maps onto.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Declared properties, keyed by field name.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, FieldSpec> {
        &self.properties
    }

    /// Fields mandatory on full (create) validation.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Fields whose values must be distinct across non-deleted records.
    #[must_use]
    pub fn unique(&self) -> &[String] {
        &self.unique
    }

    /// Fields eligible as equality filters in list queries.
    #[must_use]
    pub fn searchable(&self) -> &[String] {
        &self.searchable
    }

    /// The timestamp field targeted by `after`/`before`/`between`.
    #[must_use]
    pub fn date_field(&self) -> &str {
        &self.date_field
    }

    /// Look up the spec for a declared property.
    #[must_use]
    pub fn property(&self, field: &str) -> Option<&FieldSpec> {
        self.properties.get(field)
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    collection: Option<String>,
    properties: BTreeMap<String, FieldSpec>,
    required: Vec<String>,
    unique: Vec<String>,
    searchable: Option<Vec<String>>,
    date_field: String,
}

impl SchemaBuilder {
    /// Override the storage collection name.
    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Declare a property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.properties.insert(name.into(), spec);
        self
    }

    /// Declare the fields mandatory on full validation.
    #[must_use]
    pub fn required<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Declare the fields whose values must be unique across active records.
    #[must_use]
    pub fn unique<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict which fields may appear as query filters.
    ///
    /// When not called, every declared property is searchable.
    #[must_use]
    pub fn searchable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Override the timestamp field targeted by the range operators.
    #[must_use]
    pub fn date_field(mut self, field: impl Into<String>) -> Self {
        self.date_field = field.into();
        self
    }

    /// Validate and freeze the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the descriptor is empty or when a
    /// `required`, `unique`, or `searchable` entry names an undeclared field.
    pub fn build(self) -> Result<Schema, SchemaError> {
        if self.properties.is_empty() {
            return Err(SchemaError::Empty(self.name));
        }
        for field in &self.required {
            if !self.properties.contains_key(field) {
                return Err(SchemaError::UnknownRequired(field.clone()));
            }
        }
        for field in &self.unique {
            if !self.properties.contains_key(field) {
                return Err(SchemaError::UnknownUnique(field.clone()));
            }
        }
        let searchable = match self.searchable {
            Some(fields) => {
                for field in &fields {
                    if !self.properties.contains_key(field) {
                        return Err(SchemaError::UnknownSearchable(field.clone()));
                    }
                }
                fields
            }
            None => self.properties.keys().cloned().collect(),
        };
        Ok(Schema {
            collection: self.collection.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            properties: self.properties,
            required: self.required,
            unique: self.unique,
            searchable,
            date_field: self.date_field,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_builder() -> SchemaBuilder {
        Schema::builder("user")
            .property("name", FieldSpec::string())
            .property("email", FieldSpec::string())
            .property("age", FieldSpec::number())
            .property("lastLogin", FieldSpec::date_time())
    }

    #[test]
    fn test_collection_defaults_to_name() {
        let schema = user_builder().build().unwrap();
        assert_eq!(schema.name(), "user");
        assert_eq!(schema.collection(), "user");
    }

    #[test]
    fn test_collection_override() {
        let schema = user_builder().collection("users").build().unwrap();
        assert_eq!(schema.collection(), "users");
    }

    #[test]
    fn test_searchable_defaults_to_all_properties() {
        let schema = user_builder().build().unwrap();
        let mut searchable = schema.searchable().to_vec();
        searchable.sort();
        assert_eq!(searchable, vec!["age", "email", "lastLogin", "name"]);
    }

    #[test]
    fn test_searchable_explicit() {
        let schema = user_builder().searchable(["email"]).build().unwrap();
        assert_eq!(schema.searchable(), ["email".to_string()]);
    }

    #[test]
    fn test_date_field_default() {
        let schema = user_builder().build().unwrap();
        assert_eq!(schema.date_field(), "updatedAt");
    }

    #[test]
    fn test_empty_schema_rejected() {
        let err = Schema::builder("empty").build().unwrap_err();
        assert_eq!(err, SchemaError::Empty("empty".to_string()));
    }

    #[test]
    fn test_unknown_required_rejected() {
        let err = user_builder().required(["missing"]).build().unwrap_err();
        assert_eq!(err, SchemaError::UnknownRequired("missing".to_string()));
    }

    #[test]
    fn test_unknown_unique_rejected() {
        let err = user_builder().unique(["missing"]).build().unwrap_err();
        assert_eq!(err, SchemaError::UnknownUnique("missing".to_string()));
    }

    #[test]
    fn test_unknown_searchable_rejected() {
        let err = user_builder().searchable(["missing"]).build().unwrap_err();
        assert_eq!(err, SchemaError::UnknownSearchable("missing".to_string()));
    }

    #[test]
    fn test_nullable_spec() {
        let spec = FieldSpec::string().nullable();
        assert!(spec.nullable);
        assert_eq!(spec.field_type, FieldType::String);
    }

    #[test]
    fn test_nested_specs() {
        let spec = FieldSpec::array(FieldSpec::object([
            ("at", FieldSpec::date_time()),
            ("note", FieldSpec::string()),
        ]));
        match spec.field_type {
            FieldType::Array(element) => match element.field_type {
                FieldType::Object(props) => {
                    assert_eq!(props.len(), 2);
                    assert_eq!(props["at"].field_type, FieldType::DateTime);
                }
                other => panic!("expected object element, got {other:?}"),
            },
            other => panic!("expected array, got {other:?}"),
        }
    }
}
