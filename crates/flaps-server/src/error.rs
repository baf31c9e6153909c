//! Application error type: bridges [`flaps_core::FlapsError`] and
//! [`flaps_storage::StorageError`] (two distinct types — flaps-core has no
//! I/O dependencies and so cannot name the real storage error) into a
//! single `axum` response, classified through the shared [`ErrorKind`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use flaps_core::{ErrorKind, FlapsError};
use flaps_storage::StorageError;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] FlapsError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0}")]
    BadRequest(String),

    #[error("missing or invalid credential")]
    Unauthorized,
}

impl AppError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(e) => e.kind(),
            Self::Storage(e) => storage_error_kind(e),
            Self::BadRequest(_) => ErrorKind::Validation,
            Self::Unauthorized => ErrorKind::Unauthorized,
        }
    }
}

fn storage_error_kind(e: &StorageError) -> ErrorKind {
    match e {
        StorageError::NotFound { .. } => ErrorKind::NotFound,
        StorageError::Duplicate { .. } | StorageError::ForeignKeyViolation { .. } => ErrorKind::Conflict,
        StorageError::Database(_) | StorageError::Cache(_) | StorageError::Migration(_) => {
            ErrorKind::Transient
        },
        StorageError::Serialization(_) | StorageError::Configuration(_) => ErrorKind::Internal,
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "unhandled error");
        }

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = AppError::Storage(StorageError::not_found("Flag", "key", "checkout"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let err = AppError::Storage(StorageError::duplicate("Flag", "key", "checkout"));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
