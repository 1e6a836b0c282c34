//! Schema-driven CRUD mapping
//!
//! The pieces that turn a [`Schema`](crate::schema::Schema) plus a
//! [`DocumentStore`](crate::store::DocumentStore) into a working persistence
//! layer:
//!
//! - [`QueryFilterParser`] and [`ListRequest`]: untrusted request parameters
//!   to typed filters and resolved pagination.
//! - [`SchemaValidator`]: payload sanitization, type checking, and date
//!   canonicalization.
//! - [`unique_clauses`] / [`colliding_keys`]: the pure halves of the
//!   uniqueness check.
//! - [`CrudMapper`]: the orchestrator tying all of it to a store collection.
//!
//! # Example
//!
//! ```rust
//! use crud_mapper::mapper::CrudMapper;
//! use crud_mapper::schema::{FieldSpec, Schema};
//! use crud_mapper::store::MemoryBackend;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let schema = Schema::builder("user")
//!     .collection("users")
//!     .property("email", FieldSpec::string())
//!     .required(["email"])
//!     .unique(["email"])
//!     .build()
//!     .unwrap();
//!
//! let backend = MemoryBackend::new();
//! let mapper = CrudMapper::new(backend.collection("users"), schema);
//!
//! let payload = json!({"email": "a@example.com"});
//! let created = mapper
//!     .create(payload.as_object().unwrap())
//!     .await
//!     .unwrap();
//! assert!(created.contains_key("_id"));
//! # }
//! ```

mod crud;
mod query;
mod unique;
mod validator;

pub use crud::{CrudMapper, ListResult};
pub use query::{ListRequest, Params, QueryFilterParser};
pub use unique::{colliding_keys, unique_clauses, DuplicationError};
pub use validator::{
    SchemaValidator, ValidationError, ValidatorOptions, Violation, ViolationKind,
};
