//! Gateway configuration with validation.

use ba_01_broker::BrokerConfig;
use ba_03_decision_loop::LoopConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Correlation broker settings
    pub broker: BrokerConfig,
    /// Decide/act loop settings
    pub decision_loop: LoopConfig,
    /// Decision service settings
    pub openai: OpenAiConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.decision_loop
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.openai.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !(self.openai.base_url.starts_with("http://") || self.openai.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "openai base_url must be http(s): {}",
                self.openai.base_url
            )));
        }
        if self.openai.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("openai request_timeout cannot be 0".into()));
        }
        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Serves the command API and the worker WebSocket
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
        }
    }
}

/// OpenAI-compatible chat completions settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo-preview".to_string(),
            temperature: 0.0,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from environment variables.
///
/// | Variable | Default |
/// |----------|---------|
/// | `BA_HTTP_HOST` | `0.0.0.0` |
/// | `BA_HTTP_PORT` | `8000` |
/// | `BA_ACTION_TIMEOUT_SECS` | `30` |
/// | `BA_MAX_ITERATIONS` | `25` |
/// | `OPENAI_API_KEY` | required |
/// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
/// | `OPENAI_MODEL` | `gpt-4-turbo-preview` |
pub fn load_config() -> Result<GatewayConfig, ConfigError> {
    from_lookup(|key| std::env::var(key).ok())
}

fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<GatewayConfig, ConfigError> {
    fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
        value
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key, value })
    }

    let mut config = GatewayConfig::default();

    if let Some(host) = lookup("BA_HTTP_HOST") {
        config.http.host = parse("BA_HTTP_HOST", host)?;
    }
    if let Some(port) = lookup("BA_HTTP_PORT") {
        config.http.port = parse("BA_HTTP_PORT", port)?;
    }
    if let Some(secs) = lookup("BA_ACTION_TIMEOUT_SECS") {
        let secs: u64 = parse("BA_ACTION_TIMEOUT_SECS", secs)?;
        config.decision_loop.action_timeout = Duration::from_secs(secs);
        config.broker.default_timeout = Duration::from_secs(secs);
    }
    if let Some(max) = lookup("BA_MAX_ITERATIONS") {
        config.decision_loop.max_iterations = parse("BA_MAX_ITERATIONS", max)?;
    }
    if let Some(key) = lookup("OPENAI_API_KEY") {
        config.openai.api_key = key;
    }
    if let Some(url) = lookup("OPENAI_BASE_URL") {
        config.openai.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(model) = lookup("OPENAI_MODEL") {
        config.openai.model = model;
    }

    config.validate()?;
    Ok(config)
}
