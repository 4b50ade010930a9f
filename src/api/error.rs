//! API Errors
//!
//! Maps storage and query failures onto HTTP responses:
//!
//! | Variant      | Status | Body                          |
//! |--------------|--------|-------------------------------|
//! | `NotFound`   | 404    | `{"detail": message}`         |
//! | `Validation` | 400    | `{"field": ["message", ...]}` |
//! | `BadRequest` | 400    | `{"detail": reason}`          |
//! | `Internal`   | 500    | `{"detail": "Internal error"}`|

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::query::QueryError;
use crate::storage::{EntityKind, FieldErrors, StorageError};

/// Detail for an unknown page number.
pub const DETAIL_INVALID_PAGE: &str = "Invalid page.";

/// Detail for a pokemon without moves.
pub const DETAIL_NO_MOVES: &str = "No moves available for this Pokemon.";

/// Errors returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resource or page absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Field-level validation failure
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Request could not be parsed
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Anything the client cannot fix
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Not-found error for a record kind, e.g. "Move not found.".
    #[must_use]
    pub fn not_found(kind: EntityKind) -> Self {
        Self::NotFound(format!("{} not found.", kind.label()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Internal(cause) => {
                tracing::error!(%cause, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { kind, .. } => ApiError::not_found(kind),
            StorageError::Validation(errors) => ApiError::Validation(errors),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::PokemonNotFound(_) => ApiError::not_found(EntityKind::Pokemon),
            QueryError::NoMoves(_) => ApiError::NotFound(DETAIL_NO_MOVES.to_string()),
            QueryError::Storage(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        // Non-numeric ids never match a record route.
        ApiError::NotFound("Not found.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_not_found_uses_label() {
        let err: ApiError = StorageError::not_found(EntityKind::Type, 3).into();
        assert!(matches!(err, ApiError::NotFound(ref d) if d == "Type not found."));
    }

    #[test]
    fn test_query_errors() {
        let err: ApiError = QueryError::NoMoves(1).into();
        assert!(matches!(err, ApiError::NotFound(ref d) if d == DETAIL_NO_MOVES));

        let err: ApiError = QueryError::PokemonNotFound(1).into();
        assert!(matches!(err, ApiError::NotFound(ref d) if d == "Pokemon not found."));

        let err: ApiError = QueryError::Storage(StorageError::read("boom")).into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ApiError::Validation(FieldErrors::single("name", "bad")),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
