//! Client-facing error type and its JSON rendering.
//!
//! Every failure a handler can return ends up as
//! `{ "success": false, "error": <message> }` with a matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::storage::StoreError;

/// Errors returned by services and handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("Not authorized to access this route")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    /// Schema validation failures, reported joined.
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Duplicate field value entered")]
    Duplicate,

    #[error("Service temporarily unavailable")]
    Unavailable,

    #[error("Server Error")]
    Internal(#[source] anyhow::Error),
}

/// Convenience alias for handler and service results.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::Duplicate => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 404 for a missing record, phrased the way clients expect.
    #[must_use]
    pub fn missing(resource: &str, id: &str) -> Self {
        ApiError::NotFound(format!("No {resource} with the id of {id}"))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { .. } => ApiError::Duplicate,
            StoreError::Timeout { .. } => ApiError::Unavailable,
            StoreError::Backend(source) => ApiError::Internal(source),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(source) = &self {
            tracing::error!(error = ?source, "request failed with an internal error");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = json!({ "success": false, "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
