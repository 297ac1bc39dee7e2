//! Target URL resolution for relayed requests

use crate::proxy::params::ParamMap;
use crate::proxy::types::*;

/// Query parameter naming the passthrough target
pub const URL_PARAM: &str = "url";

/// Strategy for resolving target URLs and composing outbound URLs
pub struct UrlResolver;

impl UrlResolver {
    /// Extract the absolute passthrough URL from a raw query string
    pub fn extract_target_url(query: Option<&str>) -> RelayResult<TargetUrl> {
        let params = ParamMap::from_query(query.unwrap_or_default())?;
        let target = params
            .get(URL_PARAM)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| RelayError::InvalidRequest("Missing url param".to_string()))?;

        TargetUrl::try_new(target.to_string())
            .map_err(|_| RelayError::InvalidRequest(format!("Invalid target URL '{target}'")))
    }

    /// Compose origin, path and an already-serialized query string
    ///
    /// The query is appended verbatim: it may be covered by a signature.
    pub fn resolve(origin: &UpstreamOrigin, target: &TargetPath, query: &str) -> String {
        if query.is_empty() {
            format!("{}{}", origin.as_ref(), target.as_ref())
        } else {
            format!("{}{}?{}", origin.as_ref(), target.as_ref(), query)
        }
    }
}
