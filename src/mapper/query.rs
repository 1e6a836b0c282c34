//! Query parameter parsing for list operations
//!
//! Two concerns live here. [`QueryFilterParser`] translates untrusted request
//! parameters into a [`Filter`] through a whitelist (searchable fields plus
//! the reserved range operators), so arbitrary storage operators can never be
//! injected. [`ListRequest`] resolves the pagination, sorting, projection,
//! and flag parameters with their defaults.
//!
//! # Example
//!
//! ```rust
//! use crud_mapper::mapper::{Params, QueryFilterParser};
//! use crud_mapper::schema::{FieldSpec, Schema};
//!
//! let schema = Schema::builder("user")
//!     .property("status", FieldSpec::string())
//!     .build()
//!     .unwrap();
//! let parser = QueryFilterParser::new(&schema);
//!
//! let mut params = Params::new();
//! params.insert("status".to_string(), "active".to_string());
//! params.insert("$where".to_string(), "sleep(1000)".to_string());
//!
//! let filter = parser.parse(&params);
//! assert!(filter.references("status"));
//! assert!(!filter.references("$where")); // silently dropped
//! ```

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use crate::schema::{FieldType, Schema};
use crate::store::{Filter, FilterCondition, FilterValue, OrderDirection};

/// Raw request parameters, keyed by parameter name.
pub type Params = BTreeMap<String, String>;

/// Reserved range operator: field ≥ value on the configured date field.
const AFTER: &str = "after";
/// Reserved range operator: field ≤ value on the configured date field.
const BEFORE: &str = "before";
/// Reserved range operator: a comma-separated pair bounding both ends.
const BETWEEN: &str = "between";

fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whitelist-based translator from request parameters to a storage filter.
#[derive(Debug, Clone)]
pub struct QueryFilterParser {
    schema: Schema,
    whitelist: HashSet<String>,
    date_field: String,
}

impl QueryFilterParser {
    /// Build a parser for the schema. The whitelist is the schema's
    /// searchable set; the range operators target the schema's date field.
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        Self {
            whitelist: schema.searchable().iter().cloned().collect(),
            date_field: schema.date_field().to_string(),
            schema: schema.clone(),
        }
    }

    /// Translate request parameters into a well-formed filter.
    ///
    /// Keys outside the whitelist are silently dropped, as are values that
    /// cannot be coerced to the field's declared type. Empty params yield an
    /// empty filter.
    #[must_use]
    pub fn parse(&self, params: &Params) -> Filter {
        let mut filter = Filter::new();
        for (key, value) in params {
            match key.as_str() {
                AFTER => {
                    if let Some(instant) = parse_instant(value) {
                        filter.push(FilterCondition::gte(self.date_field.clone(), instant));
                    }
                }
                BEFORE => {
                    if let Some(instant) = parse_instant(value) {
                        filter.push(FilterCondition::lte(self.date_field.clone(), instant));
                    }
                }
                BETWEEN => {
                    if let Some((start, end)) = value.split_once(',') {
                        if let (Some(start), Some(end)) =
                            (parse_instant(start.trim()), parse_instant(end.trim()))
                        {
                            filter.push(FilterCondition::gte(self.date_field.clone(), start));
                            filter.push(FilterCondition::lte(self.date_field.clone(), end));
                        }
                    }
                }
                field if self.whitelist.contains(field) => {
                    if let Some(value) = self.coerce(field, value) {
                        filter.push(FilterCondition::eq(field, value));
                    }
                }
                _ => {}
            }
        }
        filter
    }

    /// Coerce an equality value to the field's declared type. Values that do
    /// not parse produce no predicate at all.
    fn coerce(&self, field: &str, raw: &str) -> Option<FilterValue> {
        let spec = self.schema.property(field)?;
        match spec.field_type {
            FieldType::DateTime => parse_instant(raw).map(FilterValue::DateTime),
            FieldType::Boolean => match raw {
                "true" | "1" => Some(FilterValue::Boolean(true)),
                "false" | "0" => Some(FilterValue::Boolean(false)),
                _ => None,
            },
            FieldType::Number => raw.parse::<f64>().ok().map(FilterValue::Number),
            _ => Some(FilterValue::String(raw.to_string())),
        }
    }
}

/// Resolved list parameters: pagination, sorting, projection, and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// 1-indexed page number.
    pub page: u64,
    /// Requested page size (before any lookup widening).
    pub page_size: u64,
    /// Sort field.
    pub sort: String,
    /// Sort direction.
    pub order: OrderDirection,
    /// Field projection; empty means no restriction.
    pub projection: Vec<String>,
    /// Whether soft-deleted records are included.
    pub include_deleted: bool,
    /// Whether a total count was requested.
    pub include_count: bool,
}

impl ListRequest {
    /// Resolve list parameters against the configured default page size.
    ///
    /// `_pageSize` wins over `pageSize`; page numbers below 1 become 1; sort
    /// defaults to `createdAt` descending (`order=1` asks for ascending);
    /// `deleted`/`disabled` and `_count` accept `"1"` or `"true"`.
    #[must_use]
    pub fn from_params(params: &Params, default_page_size: u64) -> Self {
        let page = params
            .get("page")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1)
            .max(1);
        let page_size = params
            .get("_pageSize")
            .or_else(|| params.get("pageSize"))
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(default_page_size)
            .max(1);
        let sort = params
            .get("sort")
            .cloned()
            .unwrap_or_else(|| "createdAt".to_string());
        let order = match params.get("order").map(String::as_str) {
            Some("1") => OrderDirection::Ascending,
            _ => OrderDirection::Descending,
        };
        let projection = params
            .get("fields")
            .map(|fields| {
                fields
                    .split(',')
                    .filter(|f| !f.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            page,
            page_size,
            sort,
            order,
            projection,
            include_deleted: flag(params, &["deleted", "disabled"]),
            include_count: flag(params, &["_count"]),
        }
    }
}

fn flag(params: &Params, keys: &[&str]) -> bool {
    keys.iter().any(|key| {
        params
            .get(*key)
            .is_some_and(|v| v == "1" || v == "true")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use crate::store::FilterOperator;

    fn schema() -> Schema {
        Schema::builder("user")
            .property("status", FieldSpec::string())
            .property("age", FieldSpec::number())
            .property("active", FieldSpec::boolean())
            .property("secret", FieldSpec::string())
            .property("lastLogin", FieldSpec::date_time())
            .searchable(["status", "age", "active", "lastLogin"])
            .build()
            .unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_empty_params_yield_empty_filter() {
        let parser = QueryFilterParser::new(&schema());
        assert!(parser.parse(&Params::new()).is_empty());
    }

    #[test]
    fn test_non_whitelisted_keys_silently_dropped() {
        let parser = QueryFilterParser::new(&schema());
        let filter = parser.parse(&params(&[
            ("secret", "x"),
            ("$where", "1"),
            ("status", "active"),
        ]));
        assert_eq!(filter.conditions().len(), 1);
        assert!(filter.references("status"));
        assert!(!filter.references("secret"));
        assert!(!filter.references("$where"));
    }

    #[test]
    fn test_equality_values_coerced_by_schema_type() {
        let parser = QueryFilterParser::new(&schema());
        let filter = parser.parse(&params(&[("age", "21"), ("active", "1")]));
        let age = filter.conditions().iter().find(|c| c.field == "age").unwrap();
        assert_eq!(age.value, FilterValue::Number(21.0));
        let active = filter.conditions().iter().find(|c| c.field == "active").unwrap();
        assert_eq!(active.value, FilterValue::Boolean(true));
    }

    #[test]
    fn test_uncoercible_values_produce_no_predicate() {
        let parser = QueryFilterParser::new(&schema());
        let filter = parser.parse(&params(&[("age", "plenty"), ("active", "maybe")]));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_after_maps_to_gte_on_date_field() {
        let parser = QueryFilterParser::new(&schema());
        let filter = parser.parse(&params(&[("after", "2024-01-01T00:00:00Z")]));
        assert_eq!(filter.conditions().len(), 1);
        let cond = &filter.conditions()[0];
        assert_eq!(cond.field, "updatedAt");
        assert_eq!(cond.operator, FilterOperator::GreaterThanOrEqual);
    }

    #[test]
    fn test_before_maps_to_lte_on_date_field() {
        let parser = QueryFilterParser::new(&schema());
        let filter = parser.parse(&params(&[("before", "2024-01-01T00:00:00Z")]));
        assert_eq!(filter.conditions()[0].operator, FilterOperator::LessThanOrEqual);
    }

    #[test]
    fn test_between_maps_to_conjunction_of_both() {
        let parser = QueryFilterParser::new(&schema());
        let filter = parser.parse(&params(&[(
            "between",
            "2024-01-01T00:00:00Z,2024-02-01T00:00:00Z",
        )]));
        assert_eq!(filter.conditions().len(), 2);
        assert!(filter
            .conditions()
            .iter()
            .all(|c| c.field == "updatedAt"));
    }

    #[test]
    fn test_malformed_range_values_dropped() {
        let parser = QueryFilterParser::new(&schema());
        assert!(parser.parse(&params(&[("after", "tomorrow")])).is_empty());
        assert!(parser
            .parse(&params(&[("between", "2024-01-01T00:00:00Z")]))
            .is_empty());
    }

    #[test]
    fn test_list_request_defaults() {
        let request = ListRequest::from_params(&Params::new(), 25);
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 25);
        assert_eq!(request.sort, "createdAt");
        assert_eq!(request.order, OrderDirection::Descending);
        assert!(request.projection.is_empty());
        assert!(!request.include_deleted);
        assert!(!request.include_count);
    }

    #[test]
    fn test_list_request_parses_everything() {
        let request = ListRequest::from_params(
            &params(&[
                ("page", "3"),
                ("_pageSize", "10"),
                ("pageSize", "99"),
                ("sort", "name"),
                ("order", "1"),
                ("fields", "name,email,"),
                ("deleted", "true"),
                ("_count", "1"),
            ]),
            25,
        );
        assert_eq!(request.page, 3);
        assert_eq!(request.page_size, 10); // _pageSize wins
        assert_eq!(request.sort, "name");
        assert_eq!(request.order, OrderDirection::Ascending);
        assert_eq!(request.projection, vec!["name", "email"]);
        assert!(request.include_deleted);
        assert!(request.include_count);
    }

    #[test]
    fn test_disabled_is_an_alias_for_deleted() {
        let request = ListRequest::from_params(&params(&[("disabled", "1")]), 25);
        assert!(request.include_deleted);
        let request = ListRequest::from_params(&params(&[("disabled", "0")]), 25);
        assert!(!request.include_deleted);
    }

    #[test]
    fn test_page_zero_becomes_page_one() {
        let request = ListRequest::from_params(&params(&[("page", "0")]), 25);
        assert_eq!(request.page, 1);
    }
}
