//! Abstract document store and the in-memory reference backend
//!
//! The mapper talks to storage through the [`DocumentStore`] trait: filtered
//! find with projection/sort/limit/skip, count, atomic find-and-update,
//! atomic find-and-delete, and insert with a caller-supplied identifier.
//! [`MemoryBackend`] provides an in-process implementation used by the
//! crate's tests.

mod error;
mod filter;
mod memory;
mod traits;

pub use error::{StorageError, StoreOperation, StoreResult};
pub use filter::{
    Filter, FilterCondition, FilterOperator, FilterValue, FindOptions, LookupSpec, OrderDirection,
};
pub use memory::{MemoryBackend, MemoryCollection};
pub use traits::{Document, DocumentStore, UpdateDocument};
