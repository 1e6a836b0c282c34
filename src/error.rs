//! Mapper error taxonomy
//!
//! Write operations fail with either a client-fixable error ([`Validation`],
//! [`Duplication`]) or an opaque storage failure. "Not found" is never an
//! error here: point lookups return `Option` because absence is an expected
//! outcome. The mapper never swallows or retries; it only attaches structure
//! before letting an error propagate to the adapter layer.
//!
//! [`Validation`]: MapperError::Validation
//! [`Duplication`]: MapperError::Duplication

use thiserror::Error;

use crate::mapper::{DuplicationError, ValidationError};
use crate::store::StorageError;

/// Error returned by mapper operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapperError {
    /// Payload failed schema validation after sanitization.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Payload collides with an existing active record on a unique field.
    #[error(transparent)]
    Duplication(#[from] DuplicationError),
    /// Opaque storage failure, surfaced unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for mapper operations.
pub type MapperResult<T> = std::result::Result<T, MapperError>;
