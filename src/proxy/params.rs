//! Ordered request parameters and their canonical query-string form
//!
//! Binance signs the query string byte for byte, so parameters keep the order
//! they were added in and are encoded exactly once, here.

use crate::proxy::types::{RelayError, RelayResult};
use serde_json::{Map, Value};

/// Parameter name the relay stamps onto signed requests
pub const TIMESTAMP_PARAM: &str = "timestamp";

/// Parameter name carrying the HMAC signature
pub const SIGNATURE_PARAM: &str = "signature";

/// Ordered string-to-string parameter mapping
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParamMap(Vec<(String, String)>);

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw (still percent-encoded) query string, keeping pair order
    pub fn from_query(raw: &str) -> RelayResult<Self> {
        raw.split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                Ok((decode_component(key)?, decode_component(value)?))
            })
            .collect()
    }

    /// Convert a JSON object into parameters
    ///
    /// Strings are taken as-is, other scalars use their JSON rendering and
    /// `null` becomes an empty value. Arrays and objects are serialized to
    /// compact JSON, which is how Binance expects list parameters.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        object
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect()
    }

    /// Append a pair, keeping any existing pair with the same key
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Replace the first pair with this key in place, or append it
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((key, value)),
        }
    }

    /// Insert every pair of `other`; its values win on key collisions
    pub fn merge(&mut self, other: ParamMap) {
        for (key, value) in other.0 {
            self.insert(key, value);
        }
    }

    /// Remove every pair with this key
    pub fn remove(&mut self, key: &str) {
        self.0.retain(|(existing, _)| existing != key);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical query string: `key=value` pairs in insertion order, joined
    /// by `&`, with keys and values percent-encoded
    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K, V> FromIterator<(K, V)> for ParamMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn decode_component(component: &str) -> RelayResult<String> {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| RelayError::InvalidRequest(format!("Invalid query string encoding: {e}")))
}
