//! # API Errors
//!
//! Maps query and store failures onto HTTP responses. Server-side failures
//! are logged in full and answered with a generic body, so predicate text and
//! bound parameters never reach the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use ca_core::QueryError;
use ca_store::StoreError;

const INTERNAL_ERROR: &str = "Internal server error";

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Query(QueryError::InvalidParameter(_)) => StatusCode::BAD_REQUEST,
            ApiError::Query(QueryError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::OutOfRange { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Query(QueryError::StorageFailure(_)) | ApiError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show the caller.
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            INTERNAL_ERROR.to_string()
        } else {
            self.to_string()
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }
        let body = Json(ErrorBody {
            error: self.public_message(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(QueryError::InvalidParameter("min".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(QueryError::NotFound("page 9".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(QueryError::StorageFailure("count".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(StoreError::Poisoned).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(StoreError::OutOfRange {
                field: "id",
                value: u64::MAX
            })
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = ApiError::from(QueryError::StorageFailure(
            "WHERE plugin = ? [\"secret\"]".into(),
        ));
        assert_eq!(err.public_message(), INTERNAL_ERROR);
    }

    #[test]
    fn test_client_errors_keep_detail() {
        let err = ApiError::from(QueryError::InvalidParameter("Invalid cause filter x".into()));
        assert!(err.public_message().contains("Invalid cause filter x"));
    }
}
