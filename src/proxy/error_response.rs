//! Unified error response handling for the relay
//!
//! Every failure the relay itself produces is rendered as a JSON object with
//! at least an `error` field. Upstream error payloads never pass through
//! here; they are relayed as-is.

use crate::proxy::headers::X_REQUEST_ID;
use crate::proxy::types::RelayError;
use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard error response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Stable error code for programmatic handling
    pub code: String,
    /// Request ID for correlation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Convert to HTTP response with proper headers
    ///
    /// The error is also kept in the response extensions so the request ID
    /// middleware can render the ID into bodies built without one.
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        let request_id = self.request_id.clone();
        let extension = self.clone();
        let mut response = (status, Json(self)).into_response();
        response.extensions_mut().insert(extension);

        if let Some(id) = request_id {
            if let Ok(header_value) = HeaderValue::from_str(&id) {
                response.headers_mut().insert(X_REQUEST_ID, header_value);
            }
        }

        response
    }
}

/// Extension trait for consistent error formatting
pub trait ErrorResponseExt {
    fn to_error_response(&self) -> ErrorResponse;

    fn status_code(&self) -> StatusCode;
}

impl ErrorResponseExt for RelayError {
    fn to_error_response(&self) -> ErrorResponse {
        let code = match self {
            RelayError::InvalidRequest(_) => "INVALID_REQUEST",
            RelayError::Configuration(_) => "CONFIGURATION_ERROR",
            RelayError::RequestTooLarge { .. } => "REQUEST_TOO_LARGE",
            RelayError::RelayFailure(_) => "RELAY_FAILURE",
        };

        let message = self.to_string();
        if message.trim().is_empty() {
            ErrorResponse::new(code, "Request failed")
        } else {
            ErrorResponse::new(code, message)
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidRequest(_) | RelayError::Configuration(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::RequestTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::RelayFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        self.to_error_response().into_response_with_status(status)
    }
}

/// JSON 404 for routes the relay does not serve
pub fn not_found_response(request_id: Option<&str>) -> Response {
    let mut error = ErrorResponse::new("NOT_FOUND", "Resource not found");
    if let Some(id) = request_id {
        error = error.with_request_id(id);
    }

    error.into_response_with_status(StatusCode::NOT_FOUND)
}

/// Helper to extract request ID from headers
pub fn extract_request_id(headers: &http::HeaderMap) -> Option<String> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}
