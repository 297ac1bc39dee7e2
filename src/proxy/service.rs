//! Main relay service implementation
//!
//! The `RelayService` owns the read-only state shared by every request and
//! turns it into an Axum router.
//!
//! ## Service Lifecycle
//!
//! ```rust,ignore
//! use binance_relay::proxy::{RelayConfig, RelayService};
//!
//! let service = RelayService::new(RelayConfig::default())?;
//! let router = service.into_router();
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```
//!
//! ## Routes
//!
//! - `GET /` and `GET /health`: status, no upstream call
//! - `ANY /binance/{*path}`: wildcard relay, signed on `x-binance-signed: true`
//! - `GET /proxy?url=`: unsigned passthrough to an absolute URL
//! - `GET /account`, `GET /balance`, `POST /signed`: always signed

use crate::proxy::balance::non_zero_balances;
use crate::proxy::clock::{Clock, MonotonicTimestamps, SystemClock};
use crate::proxy::error_response::{extract_request_id, not_found_response};
use crate::proxy::headers::{forwardable_headers, paths};
use crate::proxy::middleware_stack::RelayMiddlewareStack;
use crate::proxy::normalizer::{collect_body, InboundRequest, RequestNormalizer};
use crate::proxy::params::ParamMap;
use crate::proxy::relay::SignedRelay;
use crate::proxy::types::*;
use crate::proxy::url_resolver::UrlResolver;
use axum::{
    extract::{RawQuery, Request, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Relay configuration
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Scheme and host every relayed path is appended to
    pub upstream_origin: UpstreamOrigin,
    /// Signing credentials; `None` disables the signed routes
    pub credentials: Option<Credentials>,
    /// Maximum inbound body size
    pub max_request_size: RequestSizeLimit,
    /// Outbound timeout; `None` leaves it to the transport
    pub request_timeout: Option<Duration>,
    /// Answer CORS preflights for any origin
    pub permissive_cors: bool,
}

/// Binance production REST endpoint
pub const DEFAULT_UPSTREAM_ORIGIN: &str = "https://api.binance.com";

/// Default inbound body limit, 1MB
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            upstream_origin: UpstreamOrigin::try_new(DEFAULT_UPSTREAM_ORIGIN.to_string())
                .expect("default upstream origin is a valid https URL"),
            credentials: None,
            max_request_size: RequestSizeLimit::try_new(DEFAULT_MAX_REQUEST_BYTES)
                .expect("1MB is a valid limit"),
            request_timeout: None,
            permissive_cors: true,
        }
    }
}

/// Read-only state shared by all handlers
#[derive(Debug)]
pub struct RelayState {
    relay: SignedRelay,
    max_request_size: RequestSizeLimit,
}

impl RelayState {
    pub fn relay(&self) -> &SignedRelay {
        &self.relay
    }
}

/// Banner returned by `GET /`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub status: &'static str,
    pub message: &'static str,
    pub api_key_loaded: bool,
}

/// Main relay service
pub struct RelayService {
    state: Arc<RelayState>,
    permissive_cors: bool,
}

impl RelayService {
    /// Create a relay service backed by the system clock
    pub fn new(config: RelayConfig) -> RelayResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a relay service with a specific clock for signing timestamps
    pub fn with_clock(config: RelayConfig, clock: impl Clock + 'static) -> RelayResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            RelayError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        info!(
            upstream = %config.upstream_origin,
            signing_enabled = config.credentials.is_some(),
            "Relay configured"
        );

        let relay = SignedRelay::new(
            client,
            config.upstream_origin,
            config.credentials,
            MonotonicTimestamps::new(clock),
        );

        Ok(Self {
            state: Arc::new(RelayState {
                relay,
                max_request_size: config.max_request_size,
            }),
            permissive_cors: config.permissive_cors,
        })
    }

    pub fn state(&self) -> Arc<RelayState> {
        Arc::clone(&self.state)
    }

    /// Create an Axum router for the relay service with middleware
    pub fn into_router(self) -> Router {
        let router = Router::new()
            .route(paths::ROOT, get(root_handler))
            .route(paths::HEALTH, get(health_handler))
            .route(paths::BINANCE_PREFIX, any(binance_handler))
            .route(paths::BINANCE_ROOT, any(binance_handler))
            .route(paths::BINANCE_WILDCARD, any(binance_handler))
            .route(paths::PROXY, get(proxy_handler))
            .route(paths::ACCOUNT, get(account_handler))
            .route(paths::BALANCE, get(balance_handler))
            .route(paths::SIGNED, post(signed_handler))
            .fallback(not_found_handler)
            .with_state(self.state);

        let stack = if self.permissive_cors {
            RelayMiddlewareStack::new()
        } else {
            RelayMiddlewareStack::new().without_cors()
        };
        stack.apply_to_router(router)
    }
}

async fn root_handler(State(state): State<Arc<RelayState>>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "ok",
        message: "Binance relay is running",
        api_key_loaded: state.relay.has_credentials(),
    })
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Generic relay: the wildcard segment names the upstream path
async fn binance_handler(
    State(state): State<Arc<RelayState>>,
    request: Request,
) -> Result<UpstreamResponse, RelayError> {
    let (parts, body) = request.into_parts();
    let body = collect_body(body, state.max_request_size).await?;

    let proxy_request = RequestNormalizer::normalize(InboundRequest {
        method: &parts.method,
        path: parts.uri.path(),
        query: parts.uri.query(),
        headers: &parts.headers,
        body,
    })?;

    state.relay.relay(proxy_request).await
}

/// Plain passthrough to an absolute URL
async fn proxy_handler(
    State(state): State<Arc<RelayState>>,
    RawQuery(query): RawQuery,
) -> Result<UpstreamResponse, RelayError> {
    let target = UrlResolver::extract_target_url(query.as_deref())?;
    state.relay.passthrough(&target).await
}

/// Signed account snapshot, relayed as-is
async fn account_handler(
    State(state): State<Arc<RelayState>>,
    request: Request,
) -> Result<UpstreamResponse, RelayError> {
    let proxy_request = account_request(&request)?;
    state.relay.relay(proxy_request).await
}

/// Balances with a non-zero free or locked amount
async fn balance_handler(
    State(state): State<Arc<RelayState>>,
    request: Request,
) -> Result<Response, RelayError> {
    let proxy_request = account_request(&request)?;
    let upstream = state.relay.relay(proxy_request).await?;
    if !upstream.status.is_success() {
        return Ok(upstream.into_response());
    }

    let balances = non_zero_balances(&upstream.body)?;
    Ok(Json(balances).into_response())
}

/// Signed call to the endpoint named in the body
async fn signed_handler(
    State(state): State<Arc<RelayState>>,
    request: Request,
) -> Result<UpstreamResponse, RelayError> {
    let (parts, body) = request.into_parts();
    let body = collect_body(body, state.max_request_size).await?;

    let proxy_request = RequestNormalizer::normalize_signed_call(&body)?
        .with_headers(forwardable_headers(&parts.headers));
    state.relay.relay(proxy_request).await
}

async fn not_found_handler(headers: HeaderMap) -> Response {
    not_found_response(extract_request_id(&headers).as_deref())
}

fn account_request(request: &Request) -> RelayResult<ProxyRequest> {
    let target = TargetPath::from_fragment(paths::UPSTREAM_ACCOUNT)?;
    let params = ParamMap::from_query(request.uri().query().unwrap_or_default())?;

    Ok(ProxyRequest::new(RelayMethod::Get, target)
        .with_params(params)
        .with_headers(forwardable_headers(request.headers()))
        .signed(true))
}
