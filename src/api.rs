//! HTTP adapter for mapper errors
//!
//! Maps [`MapperError`] onto HTTP responses so axum handlers can bubble
//! mapper failures with `?`: validation failures become 422 with the full
//! violation list, uniqueness collisions become 409 naming the colliding
//! fields, and storage failures become an opaque 500. Routing and handler
//! wiring stay with the caller.
//!
//! # Example
//!
//! ```rust
//! use axum::http::StatusCode;
//! use axum::response::IntoResponse;
//! use crud_mapper::error::MapperError;
//! use crud_mapper::mapper::DuplicationError;
//!
//! let err = MapperError::from(DuplicationError { keys: vec!["email".to_string()] });
//! let response = err.into_response();
//! assert_eq!(response.status(), StatusCode::CONFLICT);
//! ```

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::MapperError;
use crate::mapper::{DuplicationError, ValidationError, Violation};

/// Response body for mapper errors.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: Value,
}

fn violation_json(violation: &Violation) -> Value {
    serde_json::json!({
        "path": violation.path,
        "code": violation.kind.to_string(),
        "message": violation.message,
    })
}

fn validation_response(error: &ValidationError) -> (StatusCode, ErrorBody) {
    let violations: Vec<Value> = error.errors.iter().map(violation_json).collect();
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        ErrorBody {
            message: Value::Array(violations),
        },
    )
}

fn duplication_response(error: &DuplicationError) -> (StatusCode, ErrorBody) {
    (
        StatusCode::CONFLICT,
        ErrorBody {
            message: Value::String(format!(
                "There is an entity with this {}",
                error.keys.join(", ")
            )),
        },
    )
}

impl IntoResponse for MapperError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation(error) => validation_response(error),
            Self::Duplication(error) => duplication_response(error),
            Self::Storage(error) => {
                // The storage detail is logged, never exposed.
                tracing::error!(operation = %error.operation, "storage failure: {}", error.message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        message: Value::String("An internal error occurred".to_string()),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::ViolationKind;
    use crate::store::{StorageError, StoreOperation};
    use serde_json::json;

    fn validation_error() -> ValidationError {
        ValidationError {
            errors: vec![Violation {
                path: "/email".to_string(),
                kind: ViolationKind::Required,
                message: "missing required field `email`".to_string(),
            }],
        }
    }

    #[test]
    fn test_validation_maps_to_422_with_violation_list() {
        let (status, body) = validation_response(&validation_error());
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body.message,
            json!([{
                "path": "/email",
                "code": "required",
                "message": "missing required field `email`",
            }])
        );
    }

    #[test]
    fn test_duplication_maps_to_409_naming_the_fields() {
        let error = DuplicationError {
            keys: vec!["email".to_string(), "aliases".to_string()],
        };
        let (status, body) = duplication_response(&error);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body.message,
            json!("There is an entity with this email, aliases")
        );
    }

    #[test]
    fn test_storage_maps_to_opaque_500() {
        let err = MapperError::from(StorageError::new(
            StoreOperation::Insert,
            "connection reset by peer",
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_into_response_status() {
        let err = MapperError::from(validation_error());
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
