//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bookshare_core::{LibraryError, SnapshotError};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// The change was applied in memory but could not be saved
    #[error("Storage error: {0}")]
    Storage(#[from] SnapshotError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Library(e) => match e {
                LibraryError::NotFound(_) => StatusCode::NOT_FOUND,
                LibraryError::Unauthorized(_) => StatusCode::FORBIDDEN,
                LibraryError::DuplicateIsbn(_) => StatusCode::CONFLICT,
                LibraryError::EditLimitExceeded { .. } => StatusCode::CONFLICT,
                LibraryError::InvalidRating(_) => StatusCode::UNPROCESSABLE_ENTITY,
                LibraryError::InvalidProgress { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                LibraryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            },
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Library(e) => e.kind(),
            ApiError::Storage(_) => "StorageError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (LibraryError::NotFound("book 1".into()), StatusCode::NOT_FOUND),
            (LibraryError::Unauthorized("no".into()), StatusCode::FORBIDDEN),
            (LibraryError::DuplicateIsbn("1".into()), StatusCode::CONFLICT),
            (
                LibraryError::EditLimitExceeded {
                    isbn: "1".into(),
                    used: 3,
                    allowance: 3,
                },
                StatusCode::CONFLICT,
            ),
            (LibraryError::InvalidRating("9".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                LibraryError::InvalidProgress {
                    pages_read: "9".into(),
                    page_count: 1,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (LibraryError::InvalidInput("blank".into()), StatusCode::BAD_REQUEST),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).into_response().status(), status);
        }
    }

    #[test]
    fn test_storage_error_is_internal() {
        let error = ApiError::from(SnapshotError::Backend("disk full".into()));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.kind(), "StorageError");
    }
}
