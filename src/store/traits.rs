//! Document store trait definition
//!
//! [`DocumentStore`] is the abstract collection interface the mapper drives.
//! It uses RPITIT (Return Position Impl Trait In Traits, Rust 1.75+) for
//! ergonomic async methods without boxing.
//!
//! Backends must guarantee that [`find_one_and_update`] and
//! [`find_one_and_delete`] are atomic find-plus-mutate operations, not
//! separate read-then-write steps; concurrent update/delete correctness
//! relies on that.
//!
//! [`find_one_and_update`]: DocumentStore::find_one_and_update
//! [`find_one_and_delete`]: DocumentStore::find_one_and_delete

use std::future::Future;

use serde_json::Value;

use super::error::StoreResult;
use super::filter::{Filter, FindOptions};

/// A stored record: a mapping from field name to JSON value.
pub type Document = serde_json::Map<String, Value>;

/// Field mutations applied by an atomic update: values to set and field
/// names to remove.
#[derive(Debug, Clone, Default)]
pub struct UpdateDocument {
    /// Fields to set (overwriting existing values).
    pub set: Document,
    /// Field names to remove from the document.
    pub unset: Vec<String>,
}

impl UpdateDocument {
    /// Create an update that sets the given fields.
    #[must_use]
    pub fn set(set: Document) -> Self {
        Self {
            set,
            unset: Vec::new(),
        }
    }

    /// Add field names to remove, builder style.
    #[must_use]
    pub fn unset<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unset = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Abstract document collection supporting the operations the mapper needs.
pub trait DocumentStore: Send + Sync {
    /// Find all documents matching the filter, honoring projection, sort,
    /// skip, limit, and the optional lookup step in [`FindOptions`].
    fn find(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Count documents matching the filter.
    fn count(&self, filter: &Filter) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Find the first document matching the filter.
    fn find_one(&self, filter: &Filter) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Insert a document carrying a caller-supplied `_id`.
    fn insert(&self, document: Document) -> impl Future<Output = StoreResult<()>> + Send;

    /// Atomically find one document matching the filter, apply the update,
    /// and return the post-update document. Returns `Ok(None)` when nothing
    /// matched; never upserts.
    fn find_one_and_update(
        &self,
        filter: &Filter,
        update: UpdateDocument,
    ) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Atomically find one document matching the filter and remove it.
    /// Returns whether a document was removed.
    fn find_one_and_delete(&self, filter: &Filter) -> impl Future<Output = StoreResult<bool>> + Send;
}
