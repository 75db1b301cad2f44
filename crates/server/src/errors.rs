use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::errors::StoreError;
use service::signing::SignError;
use tracing::error;

use crate::metrics;

/// JSON error response: `{"error": "...", "details": "..."}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details,
        }
    }

    pub fn not_found(error: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, error, None)
    }

    pub fn bad_request(error: &str, details: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, details)
    }

    pub fn conflict(error: &str, details: Option<String>) -> Self {
        Self::new(StatusCode::CONFLICT, error, details)
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", Some(err.to_string()))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.error, details = ?self.details, "request failed");
        }
        (self.status, Json(ErrorBody::new(self.error, self.details))).into_response()
    }
}

impl From<StoreError> for JsonApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidPatch(msg) => Self::conflict("Invalid Document Update", Some(msg)),
            StoreError::StorageFailure(_) | StoreError::MalformedState { .. } => {
                metrics::STORE_FAILURES_TOTAL.inc();
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Document Store Failure",
                    Some(e.to_string()),
                )
            }
        }
    }
}

impl From<SignError> for JsonApiError {
    fn from(e: SignError) -> Self {
        Self::bad_request("Error signing document", Some(e.to_string()))
    }
}
