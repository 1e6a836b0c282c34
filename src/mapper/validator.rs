//! Schema-driven payload validation and sanitization
//!
//! [`SchemaValidator`] is constructed once per mapper with explicit options;
//! there is no process-wide validation engine. On construction it takes a
//! working copy of the schema's properties and injects the three soft-delete
//! field descriptors (`deleted` boolean defaulting to false, `deletedAt`
//! date-time text, `deletedBy` nullable string); the caller's [`Schema`]
//! itself is never mutated.
//!
//! Validation sanitizes before it checks: undeclared fields are stripped, not
//! rejected, and date-time fields are coerced from their textual form to a
//! canonical UTC instant wherever they appear. The coercion walk is schema
//! driven: it descends into array-of-object sub-schemas and into
//! comparison-operator sub-objects (`$gt`, `$gte`, `$lt`, `$lte`, `$ne`,
//! `$eq`, `$in`, `$nin`) using the declared field paths, never by inspecting
//! arbitrary value shapes.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::schema::{FieldSpec, FieldType, Schema};
use crate::store::Document;

/// Comparison operators whose values are coerced when they appear under a
/// date-time field.
const DATE_COMPARISON_OPERATORS: [&str; 8] =
    ["$gt", "$gte", "$lt", "$lte", "$ne", "$eq", "$in", "$nin"];

/// Render an instant in the canonical textual form documents carry.
pub(crate) fn to_canonical(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_instant_text(text: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| to_canonical(dt.with_timezone(&Utc)))
}

/// Category of a field-level violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// A required field is missing (full validation only).
    Required,
    /// The value does not match the declared field type.
    Type,
    /// The value has the right type but an unparsable format.
    Format,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Type => write!(f, "type"),
            Self::Format => write!(f, "format"),
        }
    }
}

/// One field-level violation in a failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON-pointer-style path to the offending field (e.g. `/tags/0`).
    pub path: String,
    /// Violation category.
    pub kind: ViolationKind,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    fn new(path: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.path, self.kind, self.message)
    }
}

/// Payload failed schema validation after sanitization.
///
/// Carries the full ordered violation list, structurally untouched, for the
/// adapter layer to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Ordered field-level violations.
    pub errors: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed with {} violation(s)", self.errors.len())
    }
}

impl std::error::Error for ValidationError {}

/// Explicit validator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Strip undeclared fields instead of rejecting them.
    pub strip_unknown: bool,
    /// Collect every violation instead of stopping at the first.
    pub collect_all_errors: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            strip_unknown: true,
            collect_all_errors: true,
        }
    }
}

/// Per-mapper payload validator.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    properties: BTreeMap<String, FieldSpec>,
    required: Vec<String>,
    options: ValidatorOptions,
}

impl SchemaValidator {
    /// Build a validator for the schema, injecting the soft-delete field
    /// descriptors into the working property set.
    #[must_use]
    pub fn new(schema: &Schema, options: ValidatorOptions) -> Self {
        let mut properties = schema.properties().clone();
        properties.insert("deleted".to_string(), FieldSpec::boolean());
        properties.insert("deletedAt".to_string(), FieldSpec::date_time());
        properties.insert("deletedBy".to_string(), FieldSpec::string().nullable());
        Self {
            properties,
            required: schema.required().to_vec(),
            options,
        }
    }

    /// Validate and sanitize a payload.
    ///
    /// With `full_validation` the schema's `required` set is enforced; without
    /// it (the update path) partial payloads are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] with the ordered violation list when the
    /// sanitized payload still breaks the (possibly reduced) schema.
    pub fn validate(
        &self,
        data: &Document,
        full_validation: bool,
    ) -> Result<Document, ValidationError> {
        let mut errors = Vec::new();
        let mut sanitized = Document::new();

        for (field, value) in data {
            match self.properties.get(field) {
                Some(spec) => {
                    let path = format!("/{field}");
                    let value = check_value(&path, spec, value.clone(), &mut errors);
                    sanitized.insert(field.clone(), value);
                    if !self.options.collect_all_errors && !errors.is_empty() {
                        return Err(ValidationError { errors });
                    }
                }
                None if self.options.strip_unknown => {}
                None => {
                    sanitized.insert(field.clone(), value.clone());
                }
            }
        }

        // `deleted` defaults to false when absent.
        sanitized
            .entry("deleted".to_string())
            .or_insert(Value::Bool(false));

        if full_validation {
            let mut missing: Vec<Violation> = self
                .required
                .iter()
                .filter(|field| !sanitized.contains_key(*field))
                .map(|field| {
                    Violation::new(
                        format!("/{field}"),
                        ViolationKind::Required,
                        format!("missing required field `{field}`"),
                    )
                })
                .collect();
            if !missing.is_empty() {
                missing.extend(errors);
                return Err(ValidationError { errors: missing });
            }
        }

        if errors.is_empty() {
            Ok(sanitized)
        } else {
            Err(ValidationError { errors })
        }
    }
}

/// Type-check one value against its spec, coercing date-time text to the
/// canonical form. Returns the (possibly rewritten) value; violations are
/// appended to `errors`.
fn check_value(path: &str, spec: &FieldSpec, value: Value, errors: &mut Vec<Violation>) -> Value {
    if value.is_null() {
        if !spec.nullable {
            errors.push(Violation::new(
                path,
                ViolationKind::Type,
                "null is not allowed here",
            ));
        }
        return value;
    }
    match &spec.field_type {
        FieldType::String => {
            if !value.is_string() {
                errors.push(type_violation(path, "string", &value));
            }
            value
        }
        FieldType::Number => {
            if !value.is_number() {
                errors.push(type_violation(path, "number", &value));
            }
            value
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                errors.push(type_violation(path, "boolean", &value));
            }
            value
        }
        FieldType::DateTime => coerce_instant(path, value, errors),
        FieldType::Array(element) => match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        check_value(&format!("{path}/{index}"), element, item, errors)
                    })
                    .collect(),
            ),
            other => {
                errors.push(type_violation(path, "array", &other));
                other
            }
        },
        FieldType::Object(properties) => match value {
            Value::Object(map) => {
                let mut checked = Document::new();
                for (field, item) in map {
                    // Undeclared nested fields are stripped, same as at the
                    // top level.
                    if let Some(nested) = properties.get(&field) {
                        let item = check_value(&format!("{path}/{field}"), nested, item, errors);
                        checked.insert(field, item);
                    }
                }
                Value::Object(checked)
            }
            other => {
                errors.push(type_violation(path, "object", &other));
                other
            }
        },
    }
}

/// Coerce a date-time field value. Plain text becomes a canonical instant; a
/// comparison-operator sub-object has each operator value coerced in place.
fn coerce_instant(path: &str, value: Value, errors: &mut Vec<Violation>) -> Value {
    match value {
        Value::String(text) => match parse_instant_text(&text) {
            Some(canonical) => Value::String(canonical),
            None => {
                errors.push(Violation::new(
                    path,
                    ViolationKind::Format,
                    format!("`{text}` is not a valid date-time"),
                ));
                Value::String(text)
            }
        },
        Value::Object(map) if map.keys().all(|k| DATE_COMPARISON_OPERATORS.contains(&k.as_str())) => {
            let mut coerced = Document::new();
            for (operator, operand) in map {
                let operand = match operand {
                    Value::Array(items) => Value::Array(
                        items
                            .into_iter()
                            .enumerate()
                            .map(|(index, item)| {
                                coerce_instant(&format!("{path}/{operator}/{index}"), item, errors)
                            })
                            .collect(),
                    ),
                    other => coerce_instant(&format!("{path}/{operator}"), other, errors),
                };
                coerced.insert(operator, operand);
            }
            Value::Object(coerced)
        }
        other => {
            errors.push(type_violation(path, "date-time", &other));
            other
        }
    }
}

fn type_violation(path: &str, expected: &str, value: &Value) -> Violation {
    let actual = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    Violation::new(
        path,
        ViolationKind::Type,
        format!("expected {expected}, got {actual}"),
    )
}
