//! Relay module for the Binance REST API
//!
//! This module implements the two halves of request handling:
//! - Normalizer: turns inbound HTTP requests into `ProxyRequest`s
//! - Signed relay: optionally signs, performs the one outbound call and
//!   hands the upstream response back untouched

pub mod balance;
pub mod clock;
pub mod error_response;
pub mod headers;
pub mod middleware;
pub mod middleware_stack;
pub mod normalizer;
pub mod params;
pub mod relay;
pub mod service;
pub mod signer;
pub mod types;
pub mod url_resolver;

#[cfg(test)]
mod tests;


pub use service::{RelayConfig, RelayService};
pub use types::{RelayError, RelayResult};
