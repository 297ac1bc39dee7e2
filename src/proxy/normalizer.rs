//! Turns inbound HTTP requests into [`ProxyRequest`]s
//!
//! Everything here is a pure transformation except [`collect_body`], which
//! only reads the inbound body under a size limit.

use crate::proxy::headers::{forwardable_headers, paths, signing_requested};
use crate::proxy::params::ParamMap;
use crate::proxy::types::*;
use axum::body::Body;
use bytes::Bytes;
use http::{HeaderMap, Method};
use http_body_util::BodyExt;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Body field holding the outbound parameter mapping
pub const PARAMS_FIELD: &str = "params";

/// Body field holding the outbound request payload
pub const DATA_FIELD: &str = "data";

/// The parts of an inbound request the normalizer looks at
#[derive(Debug)]
pub struct InboundRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
    pub body: Bytes,
}

/// Body of the legacy `POST /signed` route
#[derive(Debug, Deserialize)]
pub struct SignedCall {
    pub endpoint: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    pub method: Option<String>,
}

/// Stateless request normalization
pub struct RequestNormalizer;

impl RequestNormalizer {
    /// Normalize a request to the `/binance/*` wildcard relay
    pub fn normalize(inbound: InboundRequest<'_>) -> RelayResult<ProxyRequest> {
        let method = RelayMethod::try_from(inbound.method)?;
        let target = Self::wildcard_target(inbound.path)?;
        let query_params = ParamMap::from_query(inbound.query.unwrap_or_default())?;

        let (params, body) = if method.is_write() {
            let (body_params, body) = Self::parse_write_body(&inbound.body)?;
            let mut params = query_params;
            params.merge(body_params);
            (params, body)
        } else {
            (query_params, None)
        };

        Ok(ProxyRequest::new(method, target)
            .with_params(params)
            .with_body(body)
            .with_headers(forwardable_headers(inbound.headers))
            .signed(signing_requested(inbound.headers)))
    }

    /// Normalize the legacy `POST /signed` body into a signed request
    pub fn normalize_signed_call(body: &Bytes) -> RelayResult<ProxyRequest> {
        let call: SignedCall = serde_json::from_slice(body)
            .map_err(|e| RelayError::InvalidRequest(format!("Invalid JSON body: {e}")))?;

        let endpoint = call
            .endpoint
            .filter(|endpoint| !endpoint.trim().is_empty())
            .ok_or_else(|| RelayError::InvalidRequest("Missing endpoint".to_string()))?;
        let method = match call.method.as_deref() {
            Some(method) => RelayMethod::try_from(method)?,
            None => RelayMethod::Get,
        };

        Ok(
            ProxyRequest::new(method, TargetPath::from_fragment(&endpoint)?)
                .with_params(ParamMap::from_json_object(&call.params))
                .signed(true),
        )
    }

    /// Upstream path named by the wildcard segment after `/binance/`
    pub fn wildcard_target(path: &str) -> RelayResult<TargetPath> {
        let fragment = path
            .strip_prefix(paths::BINANCE_PREFIX)
            .ok_or_else(|| RelayError::InvalidRequest("Missing target path".to_string()))?;

        TargetPath::from_fragment(fragment)
    }

    /// Split a write-verb body into its `params` mapping and `data` payload
    fn parse_write_body(body: &Bytes) -> RelayResult<(ParamMap, Option<RequestBody>)> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok((ParamMap::new(), None));
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| RelayError::InvalidRequest(format!("Invalid JSON body: {e}")))?;
        let Value::Object(mut object) = value else {
            return Err(RelayError::InvalidRequest(
                "Request body must be a JSON object".to_string(),
            ));
        };

        let params = match object.remove(PARAMS_FIELD) {
            None | Some(Value::Null) => ParamMap::new(),
            Some(Value::Object(params)) => ParamMap::from_json_object(&params),
            Some(_) => {
                return Err(RelayError::InvalidRequest(format!(
                    "'{PARAMS_FIELD}' must be a JSON object"
                )))
            }
        };

        let body = match object.remove(DATA_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(RequestBody::Text(text)),
            Some(other) => Some(RequestBody::Json(Bytes::from(other.to_string()))),
        };

        Ok((params, body))
    }
}

/// Read the whole inbound body, failing once it exceeds `limit` bytes
pub async fn collect_body(body: Body, limit: RequestSizeLimit) -> RelayResult<Bytes> {
    http_body_util::Limited::new(body, *limit.as_ref())
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| {
            if e.is::<http_body_util::LengthLimitError>() {
                RelayError::RequestTooLarge { max_size: limit }
            } else {
                RelayError::InvalidRequest(format!("Failed to read request body: {e}"))
            }
        })
}
