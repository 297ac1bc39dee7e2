use crate::proxy::service::{DEFAULT_MAX_REQUEST_BYTES, DEFAULT_UPSTREAM_ORIGIN};
use crate::proxy::types::{Credentials, RequestSizeLimit, UpstreamOrigin};
use crate::proxy::RelayConfig;
pub use config::ConfigError;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub binance: BinanceSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Deserialize, Clone)]
pub struct BinanceSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub max_body_bytes: usize,
}

// Keeps the secret out of startup logs
impl std::fmt::Debug for BinanceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceSettings")
            .field("base_url", &self.base_url)
            .field("api_key_set", &self.api_key.is_some())
            .field("api_secret_set", &self.api_secret.is_some())
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

/// Environment prefix for layered settings, e.g. `BINANCE_RELAY__LOGGING__LEVEL`
pub const ENV_PREFIX: &str = "BINANCE_RELAY";

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_sources(None)
    }

    /// Load settings, layering an explicit config file above the standard ones
    pub fn from_sources(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load(config_file, |key| env::var(key).ok())
    }

    fn load(
        config_file: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let port = lookup("PORT")
            .map(|raw| {
                raw.trim()
                    .parse::<u16>()
                    .map_err(|e| ConfigError::Message(format!("Invalid PORT '{raw}': {e}")))
            })
            .transpose()?;

        let mut builder = Config::builder()
            // Start with default values
            .set_default("application.host", "0.0.0.0")?
            .set_default("application.port", 3000)?
            .set_default("application.environment", environment.clone())?
            .set_default("binance.base_url", DEFAULT_UPSTREAM_ORIGIN)?
            .set_default("binance.max_body_bytes", DEFAULT_MAX_REQUEST_BYTES as u64)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            // Add configuration file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // Add environment variables with prefix
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            // Conventional variables win over everything else
            .set_override_option("application.port", port.map(u64::from))?
            .set_override_option("binance.api_key", lookup("BINANCE_API_KEY"))?
            .set_override_option("binance.api_secret", lookup("BINANCE_API_SECRET"))?
            .set_override_option("binance.base_url", lookup("BINANCE_BASE_URL"))?
            .build()?;

        config.try_deserialize()
    }

    /// Signing credentials, if both halves are configured
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_optional(
            self.binance.api_key.as_deref(),
            self.binance.api_secret.as_deref(),
        )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    pub fn relay_config(&self) -> crate::Result<RelayConfig> {
        let upstream_origin = UpstreamOrigin::try_new(self.binance.base_url.clone())
            .map_err(|e| crate::Error::invalid_setting("binance.base_url", e.to_string()))?;
        let max_request_size = RequestSizeLimit::try_new(self.binance.max_body_bytes)
            .map_err(|e| crate::Error::invalid_setting("binance.max_body_bytes", e.to_string()))?;

        Ok(RelayConfig {
            upstream_origin,
            credentials: self.credentials(),
            max_request_size,
            request_timeout: self.binance.request_timeout_ms.map(Duration::from_millis),
            ..RelayConfig::default()
        })
    }
}
