//! Middleware implementations for the relay service

use crate::proxy::error_response::ErrorResponse;
use crate::proxy::headers::X_REQUEST_ID;
use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Request ID middleware - ensures every request has a unique ID for tracing
///
/// A caller-supplied UUID is kept; anything else is replaced by a fresh v7.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|existing| existing.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::now_v7);

    // Hyphenated UUIDs are plain ASCII
    let header_value = HeaderValue::from_str(&request_id.to_string()).ok();

    if let Some(value) = header_value.clone() {
        request.headers_mut().insert(X_REQUEST_ID, value);
    }

    let mut response = next.run(request).await;

    // Relay errors are rendered before the ID is known to them
    if let Some(error) = response.extensions_mut().remove::<ErrorResponse>() {
        if error.request_id.is_none() {
            let status = response.status();
            response = error
                .with_request_id(request_id.to_string())
                .into_response_with_status(status);
        }
    }

    if let Some(value) = header_value {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    response
}

/// Logging middleware - logs request/response details with timing
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    info!(
        request_id = request_id,
        method = %method,
        path = %uri.path(),
        "Incoming request"
    );

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        warn!(
            request_id = request_id,
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms = duration.as_millis(),
            "Request failed"
        );
    } else {
        info!(
            request_id = request_id,
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms = duration.as_millis(),
            "Request completed"
        );
    }

    response
}
