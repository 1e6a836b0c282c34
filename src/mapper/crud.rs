//! The persistence mapper
//!
//! [`CrudMapper`] orchestrates create/read/update/soft-delete/hard-delete
//! against one store collection, delegating to the query filter parser for
//! reads and to the validator plus uniqueness check for writes, and managing
//! the audit timestamps and soft-delete fields itself.
//!
//! Record lifecycle: `active` (deleted=false) ⇄ `soft-deleted` (deleted=true)
//! → `purged` (removed by [`remove`](CrudMapper::remove), terminal). Soft
//! deletion is reversible through [`update`](CrudMapper::update); hard
//! deletion is not.
//!
//! # Known limitations
//!
//! - The uniqueness check-then-insert sequence is not atomic against
//!   concurrent creates; two racing creates can each pass the check before
//!   either commits. Callers needing strict uniqueness must also hold a
//!   storage-level unique constraint as a backstop.
//! - When a lookup (denormalization) spec is supplied and the requested page
//!   is beyond the first, the read window is widened (page size multiplied by
//!   page number) to emulate non-indexed join pagination. The result is an
//!   approximation, not exact pagination.

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::error::MapperResult;
use crate::ids::EntityId;
use crate::schema::Schema;
use crate::store::{
    Document, DocumentStore, Filter, FilterCondition, FindOptions, LookupSpec, UpdateDocument,
};

use super::query::{ListRequest, Params, QueryFilterParser};
use super::unique::{colliding_keys, unique_clauses, DuplicationError};
use super::validator::{to_canonical, SchemaValidator, ValidatorOptions};

/// Storage identifier field name.
const ID_FIELD: &str = "_id";
/// Public identifier field name in payloads and resources.
const PUBLIC_ID_FIELD: &str = "id";
/// Default page size when the request does not specify one.
const DEFAULT_PAGE_SIZE: u64 = 25;

/// An ordered page of records plus pagination metadata.
///
/// `count` and `page_count` are present only when the caller explicitly
/// requested them via the `_count` flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResult {
    /// Records on this page, in sort order.
    pub records: Vec<Document>,
    /// 1-indexed page number the records belong to.
    pub page: u64,
    /// Total number of matching records, when requested.
    pub count: Option<u64>,
    /// Total number of pages at the effective page size, when requested.
    pub page_count: Option<u64>,
}

/// Generic CRUD mapper over one document collection.
#[derive(Debug, Clone)]
pub struct CrudMapper<S> {
    store: S,
    schema: Schema,
    validator: SchemaValidator,
    parser: QueryFilterParser,
    page_size: u64,
}

impl<S: DocumentStore> CrudMapper<S> {
    /// Build a mapper for the schema over the given collection handle.
    ///
    /// The validator and filter parser are constructed here, once, with
    /// explicit configuration; nothing is shared process-wide.
    #[must_use]
    pub fn new(store: S, schema: Schema) -> Self {
        Self {
            validator: SchemaValidator::new(&schema, ValidatorOptions::default()),
            parser: QueryFilterParser::new(&schema),
            store,
            schema,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the default page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The schema this mapper serves.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// List records matching the request parameters.
    ///
    /// Soft-deleted records are excluded unless the request carries
    /// `deleted=1`/`disabled=1`. A `lookup` spec enables the single
    /// denormalization step, with the widened-window pagination
    /// approximation for pages beyond the first (see module docs).
    ///
    /// # Errors
    ///
    /// Returns a storage failure unchanged; list never fails validation.
    pub async fn list(
        &self,
        params: &Params,
        lookup: Option<&LookupSpec>,
    ) -> MapperResult<ListResult> {
        let request = ListRequest::from_params(params, self.page_size);
        let mut filter = self.parser.parse(params);

        if request.include_deleted {
            filter.remove("deleted");
        } else {
            filter.push(FilterCondition::ne("deleted", true));
        }

        let mut effective_page_size = request.page_size;
        let mut skip = (request.page - 1) * effective_page_size;
        if lookup.is_some() && request.page > 1 {
            let requested = effective_page_size;
            effective_page_size *= request.page;
            skip = effective_page_size - requested;
        }

        let options = FindOptions {
            projection: request.projection.clone(),
            sort: Some((request.sort.clone(), request.order)),
            skip,
            limit: Some(effective_page_size),
            lookup: lookup.cloned(),
        };

        debug!(
            collection = self.schema.collection(),
            page = request.page,
            page_size = effective_page_size,
            "listing records"
        );
        let records = self.store.find(&filter, &options).await?;

        let mut result = ListResult {
            records,
            page: request.page,
            count: None,
            page_count: None,
        };
        if request.include_count {
            let count = self.store.count(&filter).await?;
            result.count = Some(count);
            result.page_count = Some(count.div_ceil(effective_page_size));
        }
        Ok(result)
    }

    /// Point lookup by identifier.
    ///
    /// Returns `Ok(None)` when no record matches; soft-deleted records only
    /// match when `include_deleted` is set.
    ///
    /// # Errors
    ///
    /// Returns a storage failure unchanged.
    pub async fn detail(&self, id: &str, include_deleted: bool) -> MapperResult<Option<Document>> {
        let mut filter = Filter::new().and(FilterCondition::eq(ID_FIELD, id));
        if !include_deleted {
            filter.push(FilterCondition::ne("deleted", true));
        }
        Ok(self.store.find_one(&filter).await?)
    }

    /// Create a record from a payload.
    ///
    /// Full validation, then the uniqueness check, then identifier and
    /// timestamp assignment, then insert. A client-supplied `id` field is
    /// mapped onto the storage identifier and then replaced by a freshly
    /// generated one, and `deletedAt`/`deletedBy` are dropped unless the
    /// payload itself sets `deleted=true`.
    ///
    /// # Errors
    ///
    /// Fails with a validation or duplication error, both propagated
    /// unmodified, or with a storage failure.
    pub async fn create(&self, payload: &Document) -> MapperResult<Document> {
        let validated = self.validator.validate(payload, true)?;
        let mut data = to_database(validated);

        // Audit fields only make sense on a record born soft-deleted.
        if data.get("deleted") != Some(&Value::Bool(true)) {
            data.remove("deletedAt");
            data.remove("deletedBy");
        }

        self.check_uniqueness(&data, None).await?;

        let id = EntityId::new();
        let now = to_canonical(Utc::now());
        data.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        data.insert("createdAt".to_string(), Value::String(now.clone()));
        data.insert("updatedAt".to_string(), Value::String(now));

        debug!(collection = self.schema.collection(), id = %id, "creating record");
        self.store.insert(data.clone()).await?;
        Ok(data)
    }

    /// Update a record by identifier with a partial payload.
    ///
    /// Partial validation, then the uniqueness check excluding this record.
    /// Unless the payload itself sets `deleted=true`, the update clears the
    /// soft-delete fields (an ordinary edit doubles as reactivation); when it
    /// does, the record is soft-deleted with `deletedAt` stamped now.
    ///
    /// Returns `Ok(None)` when no record matched the identifier (and the
    /// `include_deleted` visibility).
    ///
    /// # Errors
    ///
    /// Fails with a validation or duplication error, or a storage failure.
    pub async fn update(
        &self,
        id: &str,
        payload: &Document,
        include_deleted: bool,
    ) -> MapperResult<Option<Document>> {
        let mut filter = Filter::new().and(FilterCondition::eq(ID_FIELD, id));
        if !include_deleted {
            filter.push(FilterCondition::ne("deleted", true));
        }

        let validated = self.validator.validate(payload, false)?;
        let mut data = to_database(validated);

        self.check_uniqueness(&data, Some(id)).await?;

        let now = to_canonical(Utc::now());
        data.insert("updatedAt".to_string(), Value::String(now.clone()));

        let update = if data.get("deleted") == Some(&Value::Bool(true)) {
            data.insert("deletedAt".to_string(), Value::String(now));
            UpdateDocument::set(data)
        } else {
            data.remove("deleted");
            data.remove("deletedAt");
            data.remove("deletedBy");
            UpdateDocument::set(data).unset(["deleted", "deletedAt", "deletedBy"])
        };

        debug!(collection = self.schema.collection(), id, "updating record");
        Ok(self.store.find_one_and_update(&filter, update).await?)
    }

    /// Soft-delete a record: sets `deleted=true`, stamps `deletedAt`, and
    /// records the acting identity when one is given.
    ///
    /// Only currently-active records match, so a second call for the same
    /// identifier returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a storage failure unchanged.
    pub async fn delete(&self, id: &str, actor_id: Option<&str>) -> MapperResult<Option<Document>> {
        let mut data = Document::new();
        data.insert("deleted".to_string(), Value::Bool(true));
        data.insert(
            "deletedAt".to_string(),
            Value::String(to_canonical(Utc::now())),
        );
        if let Some(actor_id) = actor_id {
            data.insert("deletedBy".to_string(), Value::String(actor_id.to_string()));
        }

        let filter = Filter::new()
            .and(FilterCondition::eq(ID_FIELD, id))
            .and(FilterCondition::ne("deleted", true));

        debug!(collection = self.schema.collection(), id, "soft-deleting record");
        Ok(self
            .store
            .find_one_and_update(&filter, UpdateDocument::set(data))
            .await?)
    }

    /// Irreversibly remove a record, regardless of its soft-delete state.
    ///
    /// Returns whether a record was removed.
    ///
    /// # Errors
    ///
    /// Returns a storage failure unchanged.
    pub async fn remove(&self, id: &str) -> MapperResult<bool> {
        let filter = Filter::new().and(FilterCondition::eq(ID_FIELD, id));
        debug!(collection = self.schema.collection(), id, "hard-deleting record");
        Ok(self.store.find_one_and_delete(&filter).await?)
    }

    /// Fail when any non-deleted record (other than `exclude_id`) collides
    /// with the payload on a declared-unique key.
    async fn check_uniqueness(&self, data: &Document, exclude_id: Option<&str>) -> MapperResult<()> {
        if self.schema.unique().is_empty() {
            return Ok(());
        }
        let clauses = unique_clauses(&self.schema, data);
        if clauses.is_empty() {
            return Ok(());
        }

        let mut filter = Filter::new()
            .any_of(clauses)
            .and(FilterCondition::ne("deleted", true));
        if let Some(exclude_id) = exclude_id {
            filter.push(FilterCondition::ne(ID_FIELD, exclude_id));
        }

        let matches = self.store.find(&filter, &FindOptions::default()).await?;
        if matches.is_empty() {
            return Ok(());
        }

        let keys = colliding_keys(&self.schema, data, &matches);
        if keys.is_empty() {
            Ok(())
        } else {
            Err(DuplicationError { keys }.into())
        }
    }
}

/// Map a payload's public `id` field onto the storage identifier field.
fn to_database(mut data: Document) -> Document {
    if let Some(id) = data.remove(PUBLIC_ID_FIELD) {
        data.insert(ID_FIELD.to_string(), id);
    }
    data
}
