//! Outbound relay to the upstream API
//!
//! Every inbound request becomes exactly one outbound call. The response is
//! handed back without looking at its status: upstream errors reach the
//! caller exactly as the upstream sent them.

use crate::proxy::clock::MonotonicTimestamps;
use crate::proxy::headers::{content_types, X_MBX_APIKEY};
use crate::proxy::signer::RequestSigner;
use crate::proxy::types::*;
use crate::proxy::url_resolver::UrlResolver;
use http::{header, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Relays normalized requests, signing them when asked to
#[derive(Clone, Debug)]
pub struct SignedRelay {
    client: reqwest::Client,
    origin: UpstreamOrigin,
    credentials: Option<Arc<Credentials>>,
    timestamps: Arc<MonotonicTimestamps>,
}

impl SignedRelay {
    pub fn new(
        client: reqwest::Client,
        origin: UpstreamOrigin,
        credentials: Option<Credentials>,
        timestamps: MonotonicTimestamps,
    ) -> Self {
        Self {
            client,
            origin,
            credentials: credentials.map(Arc::new),
            timestamps: Arc::new(timestamps),
        }
    }

    /// Whether both halves of the credential pair were configured
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Outbound URL for an unsigned request
    pub fn unsigned_url(&self, request: &ProxyRequest) -> String {
        UrlResolver::resolve(
            &self.origin,
            &request.target,
            &request.params.to_query_string(),
        )
    }

    /// Timestamp and sign a request with the configured credentials
    pub fn sign(&self, request: ProxyRequest) -> RelayResult<SignedRequest> {
        let credentials = self.require_credentials()?;
        RequestSigner::new(credentials.api_secret().clone())
            .sign_request(request, self.timestamps.next())
    }

    /// Relay a request, signing it first if it asks for that
    pub async fn relay(&self, request: ProxyRequest) -> RelayResult<UpstreamResponse> {
        if request.signed {
            self.relay_signed(request).await
        } else {
            self.relay_unsigned(request).await
        }
    }

    /// Fetch an absolute URL with a bare GET; no credentials involved
    pub async fn passthrough(&self, target: &TargetUrl) -> RelayResult<UpstreamResponse> {
        self.execute(
            RelayMethod::Get,
            target.as_ref(),
            HeaderMap::new(),
            None,
        )
        .await
    }

    async fn relay_unsigned(&self, request: ProxyRequest) -> RelayResult<UpstreamResponse> {
        let url = self.unsigned_url(&request);
        self.execute(request.method, &url, request.headers, request.body)
            .await
    }

    async fn relay_signed(&self, request: ProxyRequest) -> RelayResult<UpstreamResponse> {
        let api_key = self.require_credentials()?.api_key().clone();
        let signed = self.sign(request)?;

        let url = UrlResolver::resolve(&self.origin, &signed.request.target, &signed.query_string());
        let mut headers = signed.request.headers;
        headers.insert(
            X_MBX_APIKEY,
            HeaderValue::from_str(api_key.as_ref()).map_err(|_| {
                RelayError::Configuration("API key is not a valid header value".to_string())
            })?,
        );

        debug!(
            path = %signed.request.target,
            timestamp = %signed.timestamp,
            "Relaying signed request"
        );

        self.execute(signed.request.method, &url, headers, signed.request.body)
            .await
    }

    fn require_credentials(&self) -> RelayResult<&Credentials> {
        self.credentials.as_deref().ok_or_else(|| {
            RelayError::Configuration(
                "API key and secret must both be configured for signed requests".to_string(),
            )
        })
    }

    async fn execute(
        &self,
        method: RelayMethod,
        url: &str,
        mut headers: HeaderMap,
        body: Option<RequestBody>,
    ) -> RelayResult<UpstreamResponse> {
        let start_time = Instant::now();

        let mut outbound = self.client.request(method.as_http(), url);
        if method.is_write() {
            match body {
                Some(RequestBody::Text(text)) => {
                    headers.insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static(content_types::TEXT_PLAIN),
                    );
                    outbound = outbound.body(text);
                }
                Some(RequestBody::Json(json)) => {
                    headers.insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static(content_types::APPLICATION_JSON),
                    );
                    outbound = outbound.body(json);
                }
                None => {}
            }
        }

        let response = outbound
            .headers(headers)
            .send()
            .await
            .map_err(relay_failure)?;

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes().await.map_err(relay_failure)?;

        info!(
            method = ?method,
            status = status.as_u16(),
            duration_ms = start_time.elapsed().as_millis(),
            "Upstream responded"
        );

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

fn relay_failure(error: reqwest::Error) -> RelayError {
    // reqwest errors include the URL, which may carry a signature
    let error = error.without_url();
    warn!(error = %error, "Upstream call failed");

    if error.is_timeout() {
        RelayError::RelayFailure(format!("Upstream request timed out: {error}"))
    } else {
        RelayError::RelayFailure(error.to_string())
    }
}
