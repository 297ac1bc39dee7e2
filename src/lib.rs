//! Binance relay - a small HTTP relay in front of the Binance REST API
//!
//! Requests are relayed unsigned, or signed with HMAC-SHA256 using
//! credentials loaded once at startup so callers never hold the secret.

pub mod application;
pub mod config;
pub mod error;
pub mod proxy;

pub use application::Application;
pub use error::{Error, Result};
