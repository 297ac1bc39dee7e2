//! HTTP header constants and forwarding rules for the relay
//!
//! This module centralizes header names, well-known paths and the list of
//! inbound headers that must never reach the upstream API.

use ::http::header::{self, HeaderMap, HeaderName};

/// Inbound flag selecting the signed relay path
pub const X_BINANCE_SIGNED: &str = "x-binance-signed";

/// Header Binance reads the API key from
pub const X_MBX_APIKEY: &str = "x-mbx-apikey";

/// Header name for request ID used for tracing and correlation
pub const X_REQUEST_ID: &str = "x-request-id";

/// Standard header re-exports for convenience
pub use header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};

/// Well-known paths
pub mod paths {
    /// Service banner
    pub const ROOT: &str = "/";

    /// Liveness probe
    pub const HEALTH: &str = "/health";

    /// Prefix of the wildcard relay
    pub const BINANCE_PREFIX: &str = "/binance";

    /// Wildcard relay root, which names no upstream path
    pub const BINANCE_ROOT: &str = "/binance/";

    /// Wildcard relay route
    pub const BINANCE_WILDCARD: &str = "/binance/{*path}";

    /// Absolute-URL passthrough
    pub const PROXY: &str = "/proxy";

    /// Signed account snapshot
    pub const ACCOUNT: &str = "/account";

    /// Non-zero balances
    pub const BALANCE: &str = "/balance";

    /// Signed call to an endpoint named in the body
    pub const SIGNED: &str = "/signed";

    /// Upstream account endpoint
    pub const UPSTREAM_ACCOUNT: &str = "/api/v3/account";
}

/// Common content types
pub mod content_types {
    pub const APPLICATION_JSON: &str = "application/json";
    pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
}

/// Inbound headers that are never forwarded upstream
///
/// Transport headers would describe the inbound connection rather than the
/// outbound one, and relay-control headers are consumed here.
pub const EXCLUDED_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "content-type",
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authorization",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
    "accept-encoding",
    "cookie",
    "origin",
    "referer",
    X_BINANCE_SIGNED,
    X_MBX_APIKEY,
    X_REQUEST_ID,
];

/// Whether an inbound header may be relayed
pub fn is_forwardable(name: &HeaderName) -> bool {
    !EXCLUDED_HEADERS.contains(&name.as_str())
}

/// Copy the forwardable subset of `headers`, preserving order
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| is_forwardable(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Whether the signing flag header is set to `true`
pub fn signing_requested(headers: &HeaderMap) -> bool {
    headers
        .get(X_BINANCE_SIGNED)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
