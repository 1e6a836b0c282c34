//! Hypermedia (HAL) rendering
//!
//! Turns mapper output into `application/hal+json` shapes: a [`Resource`] for
//! a single record and a [`Collection`] for a page of records. Rendering
//! renames the storage identifier `_id` to the public `id`, hides the
//! soft-delete bookkeeping on active records, and derives the pagination
//! links from the request parameters with only `page` rewritten per link.
//!
//! # Example
//!
//! ```rust
//! use crud_mapper::hal::Resource;
//! use serde_json::json;
//!
//! let record = json!({"_id": "abc", "name": "x", "deleted": false});
//! let resource = Resource::from_document(record.as_object().unwrap().clone(), "/users");
//! let rendered = serde_json::to_value(&resource).unwrap();
//!
//! assert_eq!(rendered["id"], json!("abc"));
//! assert_eq!(rendered["_links"]["self"]["href"], json!("/users/abc"));
//! assert!(rendered.get("deleted").is_none());
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::mapper::{ListResult, Params};
use crate::store::Document;

/// A single hyperlink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    /// Target of the link.
    pub href: String,
}

impl Link {
    /// Build a link to `href`.
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

/// One record rendered as a HAL resource: its public state plus `_links`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    #[serde(rename = "_links")]
    links: BTreeMap<String, Link>,
    #[serde(flatten)]
    state: Document,
}

impl Resource {
    /// Render a stored document under `base_path`.
    ///
    /// `_id` becomes the leading `id` field and the self link is
    /// `{base_path}/{id}`. On active records (`deleted == false`) the
    /// soft-delete fields are omitted; on soft-deleted records they are kept
    /// so the caller can see when and by whom.
    #[must_use]
    pub fn from_document(document: Document, base_path: &str) -> Self {
        let mut state = Document::new();
        let id = match document.get("_id") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        state.insert("id".to_string(), Value::String(id.clone()));
        let active = document.get("deleted") == Some(&Value::Bool(false));
        for (key, value) in document {
            if key == "_id" {
                continue;
            }
            if active && matches!(key.as_str(), "deleted" | "deletedAt" | "deletedBy") {
                continue;
            }
            state.insert(key, value);
        }

        let mut links = BTreeMap::new();
        links.insert(
            "self".to_string(),
            Link::new(format!("{}/{}", base_path.trim_end_matches('/'), id)),
        );
        Self { links, state }
    }

    /// The rendered state, without `_links`.
    #[must_use]
    pub fn state(&self) -> &Document {
        &self.state
    }
}

/// A page of records rendered as a HAL collection.
///
/// The embedded resources live under `_embedded.{key}`; `_count` is the
/// number of embedded entries on this page, while `_total_items` and
/// `_page_count` appear only when the underlying list was counted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    #[serde(rename = "_links")]
    links: BTreeMap<String, Link>,
    #[serde(rename = "_embedded")]
    embedded: BTreeMap<String, Vec<Resource>>,
    #[serde(rename = "_page")]
    page: u64,
    #[serde(rename = "_count")]
    count: u64,
    #[serde(rename = "_total_items", skip_serializing_if = "Option::is_none")]
    total_items: Option<u64>,
    #[serde(rename = "_page_count", skip_serializing_if = "Option::is_none")]
    page_count: Option<u64>,
}

impl Collection {
    /// Render a list page under `base_path`, embedding the records under
    /// `embed_key` (conventionally the collection name).
    ///
    /// Link rules: `self` reflects the request as received; `next` is always
    /// present; `prev` appears past the first page; `first` appears past the
    /// second (where `prev` no longer reaches it); `last` appears only when
    /// the page count is known and lies beyond the next page. Every link
    /// keeps the request parameters and rewrites only `page`.
    #[must_use]
    pub fn from_list(
        result: ListResult,
        base_path: &str,
        params: &Params,
        embed_key: &str,
    ) -> Self {
        let page = result.page;
        let mut links = BTreeMap::new();
        links.insert("self".to_string(), Link::new(self_href(base_path, params)));
        if page > 2 {
            links.insert(
                "first".to_string(),
                Link::new(page_href(base_path, params, 1)),
            );
        }
        if page > 1 {
            links.insert(
                "prev".to_string(),
                Link::new(page_href(base_path, params, page - 1)),
            );
        }
        links.insert(
            "next".to_string(),
            Link::new(page_href(base_path, params, page + 1)),
        );
        if let Some(page_count) = result.page_count {
            if page + 1 < page_count {
                links.insert(
                    "last".to_string(),
                    Link::new(page_href(base_path, params, page_count)),
                );
            }
        }

        let resources: Vec<Resource> = result
            .records
            .into_iter()
            .map(|record| Resource::from_document(record, base_path))
            .collect();
        let count = resources.len() as u64;
        let mut embedded = BTreeMap::new();
        embedded.insert(embed_key.to_string(), resources);

        Self {
            links,
            embedded,
            page,
            count,
            total_items: result.count,
            page_count: result.page_count,
        }
    }
}

fn self_href(base_path: &str, params: &Params) -> String {
    if params.is_empty() {
        return base_path.to_string();
    }
    let query: String = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{base_path}?{query}")
}

/// The same request with `page` rewritten.
fn page_href(base_path: &str, params: &Params, page: u64) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        if key != "page" {
            serializer.append_pair(key, value);
        }
    }
    serializer.append_pair("page", &page.to_string());
    format!("{base_path}?{}", serializer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other:?}"),
        }
    }

    fn list(page: u64, records: usize, page_count: Option<u64>) -> ListResult {
        ListResult {
            records: (0..records)
                .map(|i| doc(json!({"_id": format!("id-{i}"), "name": format!("n{i}")})))
                .collect(),
            page,
            count: page_count.map(|pc| pc * 10),
            page_count,
        }
    }

    #[test]
    fn test_resource_renames_id_and_links_self() {
        let resource =
            Resource::from_document(doc(json!({"_id": "abc", "name": "x"})), "/users/");
        let rendered = serde_json::to_value(&resource).unwrap();
        assert_eq!(rendered["id"], json!("abc"));
        assert!(rendered.get("_id").is_none());
        assert_eq!(rendered["_links"]["self"]["href"], json!("/users/abc"));
    }

    #[test]
    fn test_active_record_hides_soft_delete_fields() {
        let resource = Resource::from_document(
            doc(json!({"_id": "a", "deleted": false, "deletedAt": null, "deletedBy": null})),
            "/users",
        );
        let rendered = serde_json::to_value(&resource).unwrap();
        assert!(rendered.get("deleted").is_none());
        assert!(rendered.get("deletedAt").is_none());
        assert!(rendered.get("deletedBy").is_none());
    }

    #[test]
    fn test_soft_deleted_record_keeps_audit_fields() {
        let resource = Resource::from_document(
            doc(json!({
                "_id": "a",
                "deleted": true,
                "deletedAt": "2024-06-01T10:00:00.000Z",
                "deletedBy": "admin"
            })),
            "/users",
        );
        let rendered = serde_json::to_value(&resource).unwrap();
        assert_eq!(rendered["deleted"], json!(true));
        assert_eq!(rendered["deletedAt"], json!("2024-06-01T10:00:00.000Z"));
        assert_eq!(rendered["deletedBy"], json!("admin"));
    }

    #[test]
    fn test_collection_embeds_and_counts_page_entries() {
        let collection = Collection::from_list(list(1, 3, None), "/users", &Params::new(), "users");
        let rendered = serde_json::to_value(&collection).unwrap();
        assert_eq!(rendered["_page"], json!(1));
        assert_eq!(rendered["_count"], json!(3));
        assert!(rendered.get("_total_items").is_none());
        assert!(rendered.get("_page_count").is_none());
        assert_eq!(rendered["_embedded"]["users"].as_array().unwrap().len(), 3);
        assert_eq!(
            rendered["_embedded"]["users"][0]["_links"]["self"]["href"],
            json!("/users/id-0")
        );
    }

    #[test]
    fn test_collection_totals_present_when_counted() {
        let collection = Collection::from_list(list(1, 3, Some(4)), "/users", &Params::new(), "users");
        let rendered = serde_json::to_value(&collection).unwrap();
        assert_eq!(rendered["_total_items"], json!(40));
        assert_eq!(rendered["_page_count"], json!(4));
    }

    #[test]
    fn test_first_page_links_to_next_only() {
        let collection = Collection::from_list(list(1, 1, None), "/users", &Params::new(), "users");
        let rendered = serde_json::to_value(&collection).unwrap();
        let links = rendered["_links"].as_object().unwrap();
        assert!(links.contains_key("self"));
        assert!(links.contains_key("next"));
        assert!(!links.contains_key("prev"));
        assert!(!links.contains_key("first"));
        assert_eq!(links["next"]["href"], json!("/users?page=2"));
    }

    #[test]
    fn test_second_page_gains_prev_but_not_first() {
        let collection = Collection::from_list(list(2, 1, None), "/users", &Params::new(), "users");
        let rendered = serde_json::to_value(&collection).unwrap();
        let links = rendered["_links"].as_object().unwrap();
        assert_eq!(links["prev"]["href"], json!("/users?page=1"));
        assert!(!links.contains_key("first"));
    }

    #[test]
    fn test_deep_page_gains_first_and_last() {
        let collection = Collection::from_list(list(3, 1, Some(9)), "/users", &Params::new(), "users");
        let rendered = serde_json::to_value(&collection).unwrap();
        let links = rendered["_links"].as_object().unwrap();
        assert_eq!(links["first"]["href"], json!("/users?page=1"));
        assert_eq!(links["prev"]["href"], json!("/users?page=2"));
        assert_eq!(links["next"]["href"], json!("/users?page=4"));
        assert_eq!(links["last"]["href"], json!("/users?page=9"));
    }

    #[test]
    fn test_last_link_absent_when_next_page_is_final() {
        // page 3 of 4: the next link already reaches the final page.
        let collection = Collection::from_list(list(3, 1, Some(4)), "/users", &Params::new(), "users");
        let rendered = serde_json::to_value(&collection).unwrap();
        assert!(rendered["_links"].get("last").is_none());
    }

    #[test]
    fn test_links_preserve_query_parameters_and_rewrite_page() {
        let mut params = Params::new();
        params.insert("status".to_string(), "active".to_string());
        params.insert("page".to_string(), "2".to_string());
        let collection = Collection::from_list(list(2, 1, None), "/users", &params, "users");
        let rendered = serde_json::to_value(&collection).unwrap();
        let links = rendered["_links"].as_object().unwrap();
        assert_eq!(links["self"]["href"], json!("/users?page=2&status=active"));
        assert_eq!(links["next"]["href"], json!("/users?status=active&page=3"));
        assert_eq!(links["prev"]["href"], json!("/users?status=active&page=1"));
    }
}
