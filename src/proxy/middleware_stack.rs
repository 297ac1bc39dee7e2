//! Middleware stack builder for clean composition

use crate::proxy::middleware::*;
use axum::{middleware::from_fn, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Builder for composing the relay middleware stack
#[derive(Clone, Debug)]
pub struct RelayMiddlewareStack {
    permissive_cors: bool,
}

impl RelayMiddlewareStack {
    pub fn new() -> Self {
        Self {
            permissive_cors: true,
        }
    }

    /// Drop the CORS layer, e.g. when a gateway in front already handles it
    pub fn without_cors(mut self) -> Self {
        self.permissive_cors = false;
        self
    }

    /// Apply the complete middleware stack to a router
    ///
    /// Outer to inner: CORS, HTTP tracing spans, request ID, request logging.
    /// The request ID is assigned before logging so every log line carries it.
    pub fn apply_to_router<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let router = router
            .layer(from_fn(logging_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http());

        if self.permissive_cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }
}

impl Default for RelayMiddlewareStack {
    fn default() -> Self {
        Self::new()
    }
}
