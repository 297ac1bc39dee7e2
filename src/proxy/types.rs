//! Type definitions for the relay module

use crate::proxy::params::ParamMap;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ========== Size Types ==========

/// Maximum size for inbound request bodies in bytes
#[nutype(
    derive(Clone, Copy, Debug, Display, PartialEq, Deserialize, Serialize, TryFrom, AsRef),
    validate(predicate = |size: &usize| *size > 0)
)]
pub struct RequestSizeLimit(usize);

// ========== Upstream Addressing ==========

/// Scheme and host of the upstream API, without a trailing slash
#[nutype(
    sanitize(trim, with = |s: String| s.trim_end_matches('/').to_string()),
    validate(predicate = |s: &str| s.starts_with("http://") || s.starts_with("https://")),
    derive(Clone, Debug, Display, PartialEq, Deserialize, Serialize, TryFrom, AsRef)
)]
pub struct UpstreamOrigin(String);

/// Absolute URL for the plain passthrough route
#[nutype(
    sanitize(trim),
    validate(predicate = |s: &str| s.starts_with("http://") || s.starts_with("https://")),
    derive(Clone, Debug, Display, Deserialize, Serialize, TryFrom, AsRef)
)]
pub struct TargetUrl(String);

/// Upstream-relative path, always starting with `/` and never just `/`
#[nutype(
    validate(predicate = |s: &str| s.len() > 1 && s.starts_with('/')),
    derive(Clone, Debug, Display, PartialEq, Eq, Deserialize, Serialize, TryFrom, AsRef)
)]
pub struct TargetPath(String);

impl TargetPath {
    /// Build a target path from a path fragment that may lack its leading slash
    pub fn from_fragment(fragment: &str) -> RelayResult<Self> {
        let trimmed = fragment.trim();
        let candidate = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };

        Self::try_new(candidate)
            .map_err(|_| RelayError::InvalidRequest("Missing target path".to_string()))
    }
}

// ========== Credentials ==========

/// Binance API key, sent in the clear as a header
#[nutype(
    sanitize(trim),
    validate(not_empty),
    derive(Clone, Debug, PartialEq, Eq, AsRef, TryFrom)
)]
pub struct ApiKey(String);

/// Binance API secret, only ever used as HMAC key material
#[nutype(sanitize(trim), validate(not_empty), derive(Clone, AsRef, TryFrom))]
pub struct ApiSecret(String);

impl fmt::Debug for ApiSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiSecret([REDACTED])")
    }
}

/// Process-wide credential pair, loaded once at startup
#[derive(Clone, Debug)]
pub struct Credentials {
    api_key: ApiKey,
    api_secret: ApiSecret,
}

impl Credentials {
    pub fn new(api_key: ApiKey, api_secret: ApiSecret) -> Self {
        Self {
            api_key,
            api_secret,
        }
    }

    /// Returns `None` unless both values are present and non-blank
    pub fn from_optional(api_key: Option<&str>, api_secret: Option<&str>) -> Option<Self> {
        let api_key = ApiKey::try_new(api_key?.to_string()).ok()?;
        let api_secret = ApiSecret::try_new(api_secret?.to_string()).ok()?;
        Some(Self::new(api_key, api_secret))
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    pub fn api_secret(&self) -> &ApiSecret {
        &self.api_secret
    }
}

// ========== Signing Types ==========

/// Milliseconds since the Unix epoch
#[nutype(derive(
    Clone,
    Copy,
    Debug,
    Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Deserialize,
    Serialize,
    From,
    AsRef
))]
pub struct TimestampMillis(u64);

/// Lowercase hex HMAC-SHA256 digest
///
/// Only the signer constructs these, so the value is always 64 hex characters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature(String);

impl Signature {
    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ========== Request Types ==========

/// HTTP verbs the relay forwards
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelayMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl RelayMethod {
    /// Write verbs carry their parameters and payload in the request body
    pub fn is_write(self) -> bool {
        !matches!(self, Self::Get | Self::Head)
    }

    pub fn as_http(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Head => Method::HEAD,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }
}

impl TryFrom<&Method> for RelayMethod {
    type Error = RelayError;

    fn try_from(method: &Method) -> Result<Self, Self::Error> {
        match *method {
            Method::GET => Ok(Self::Get),
            Method::HEAD => Ok(Self::Head),
            Method::POST => Ok(Self::Post),
            Method::PUT => Ok(Self::Put),
            Method::PATCH => Ok(Self::Patch),
            Method::DELETE => Ok(Self::Delete),
            ref other => Err(RelayError::InvalidRequest(format!(
                "Unsupported HTTP method: {other}"
            ))),
        }
    }
}

impl TryFrom<&str> for RelayMethod {
    type Error = RelayError;

    fn try_from(method: &str) -> Result<Self, Self::Error> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| RelayError::InvalidRequest(format!("Invalid HTTP method: {method}")))?;
        Self::try_from(&method)
    }
}

/// Outbound payload for write verbs
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// Sent verbatim
    Text(String),
    /// Sent as `application/json`
    Json(Bytes),
}

/// A normalized inbound request, ready to be relayed
#[derive(Clone, Debug)]
pub struct ProxyRequest {
    pub method: RelayMethod,
    pub target: TargetPath,
    pub params: ParamMap,
    pub body: Option<RequestBody>,
    pub signed: bool,
    pub headers: HeaderMap,
}

impl ProxyRequest {
    /// A request with no parameters, body or forwarded headers
    pub fn new(method: RelayMethod, target: TargetPath) -> Self {
        Self {
            method,
            target,
            params: ParamMap::new(),
            body: None,
            signed: false,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_params(mut self, params: ParamMap) -> Self {
        self.params = params;
        self
    }

    pub fn with_body(mut self, body: Option<RequestBody>) -> Self {
        self.body = body;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }
}

/// A request whose query string has been signed
#[derive(Clone, Debug)]
pub struct SignedRequest {
    pub request: ProxyRequest,
    pub timestamp: TimestampMillis,
    pub signature: Signature,
    /// The exact string the signature covers
    pub canonical_query: String,
}

impl SignedRequest {
    /// Query string sent upstream: the signed bytes followed by the signature
    pub fn query_string(&self) -> String {
        format!("{}&signature={}", self.canonical_query, self.signature)
    }
}

/// Upstream status, content type and body, relayed without translation
#[derive(Clone, Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        match self.content_type {
            Some(content_type) => {
                response
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, content_type);
            }
            None => {
                response.headers_mut().remove(header::CONTENT_TYPE);
            }
        }
        response
    }
}

// ========== Errors ==========

/// Errors that can occur while handling a relayed request
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Configuration(String),

    #[error("Request too large: more than {max_size} bytes")]
    RequestTooLarge { max_size: RequestSizeLimit },

    #[error("{0}")]
    RelayFailure(String),
}

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
