//! # crud-mapper
//!
//! Schema-driven CRUD persistence mapping for document stores, with
//! soft-delete lifecycle, uniqueness enforcement, safe query-parameter
//! filtering, and hypermedia (HAL) rendering.
//!
//! ## Features
//!
//! - **Declarative schemas**: properties, required/unique/searchable sets,
//!   and the date field the range operators target
//! - **Safe list queries**: whitelist-filtered request parameters with
//!   schema-typed value coercion, pagination, sorting, and projection
//! - **Validation**: per-mapper sanitizing validator with recursive
//!   date-time canonicalization and ordered violation reporting
//! - **Soft delete**: reversible `deleted`/`deletedAt`/`deletedBy` lifecycle
//!   with a separate irreversible purge
//! - **Uniqueness**: scalar and array-element collision detection that
//!   ignores soft-deleted records and names the colliding fields
//! - **Hypermedia**: HAL resources and collections with pagination links
//! - **HTTP edge**: `IntoResponse` mapping of mapper errors (422/409/500)
//!
//! ## Example
//!
//! ```rust
//! use crud_mapper::mapper::{CrudMapper, Params};
//! use crud_mapper::schema::{FieldSpec, Schema};
//! use crud_mapper::store::MemoryBackend;
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), crud_mapper::error::MapperError> {
//!     let schema = Schema::builder("user")
//!         .collection("users")
//!         .property("name", FieldSpec::string())
//!         .property("email", FieldSpec::string())
//!         .required(["name", "email"])
//!         .unique(["email"])
//!         .build()
//!         .unwrap();
//!
//!     let backend = MemoryBackend::new();
//!     let mapper = CrudMapper::new(backend.collection("users"), schema);
//!
//!     let payload = json!({"name": "Ada", "email": "ada@example.com"});
//!     let created = mapper.create(payload.as_object().unwrap()).await?;
//!
//!     let page = mapper.list(&Params::new(), None).await?;
//!     assert_eq!(page.records.len(), 1);
//!
//!     let id = created["_id"].as_str().unwrap();
//!     mapper.delete(id, None).await?;
//!     assert!(mapper.detail(id, false).await?.is_none());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
pub mod hal;
pub mod ids;
pub mod mapper;
pub mod schema;
pub mod store;

pub use error::{MapperError, MapperResult};
pub use ids::EntityId;
pub use mapper::CrudMapper;
pub use schema::{FieldSpec, FieldType, Schema};
pub use store::{Document, DocumentStore, MemoryBackend};
