//! API error types and conversions

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use shopgate_core::UpstreamError;

/// API error type that converts to HTTP responses.
///
/// Variants holding a `String` keep internal detail for the log; the
/// client only ever sees the fixed message of the variant.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request (inbound body could not be read)
    BadRequest(String),
    /// 404 Not Found (no route for the path)
    NotFound,
    /// 413 Payload Too Large (inbound body above the configured limit)
    PayloadTooLarge { limit: usize },
    /// 502 Bad Gateway (backend unreachable, timed out, or truncated)
    BadGateway(String),
    /// 500 Internal Server Error
    Internal(String),
}

/// Standard error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl ApiError {
    /// Status code and client-facing message
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid request body"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found"),
            ApiError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload too large")
            }
            ApiError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "backend unavailable"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.parts();

        // Log errors at appropriate levels
        match &self {
            ApiError::BadGateway(detail) => {
                tracing::warn!(%detail, "Upstream unavailable");
            }
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "Internal error");
            }
            ApiError::BadRequest(detail) => {
                tracing::debug!(%detail, "API client error");
            }
            ApiError::PayloadTooLarge { limit } => {
                tracing::debug!(limit, "Request body over limit");
            }
            ApiError::NotFound => {}
        }

        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::InvalidRequest(msg) => ApiError::Internal(msg),
            other => ApiError::BadGateway(other.to_string()),
        }
    }
}
