//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use placement::PlacementError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Placement pipeline error.
    Placement(PlacementError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Placement(err) => placement_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn placement_error_to_response(err: PlacementError) -> (StatusCode, String) {
    match &err {
        PlacementError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        PlacementError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        PlacementError::InsufficientStock { .. } => (StatusCode::CONFLICT, err.to_string()),
        PlacementError::Inconsistent { .. } => {
            // The coordinator has already alerted; hide the details.
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to place order".to_string(),
            )
        }
        PlacementError::NoEffect { .. } | PlacementError::Store(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        ApiError::Placement(err)
    }
}
