//! Worker configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Broker endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://backend:8000/ws/agent";

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// WebSocket URL of the broker
    pub endpoint: String,
    /// Fixed wait before reconnecting after a channel failure
    #[serde(with = "humantime_serde")]
    pub reconnect_interval: Duration,
    /// Consecutive failed attempts before giving up. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
    /// Largest accepted inbound frame in bytes
    pub max_frame_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            reconnect_interval: Duration::from_secs(5),
            max_reconnect_attempts: None,
            max_frame_size: 1024 * 1024,
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        if self.max_reconnect_attempts == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "max_reconnect_attempts",
                reason: "must be at least 1 when set".into(),
            });
        }
        if self.max_frame_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_frame_size",
                reason: "cannot be 0".into(),
            });
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid endpoint (expected ws:// or wss://): {0}")]
    InvalidEndpoint(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Load configuration from environment variables.
///
/// - `BA_WORKER_ENDPOINT`
/// - `BA_WORKER_RECONNECT_SECS`
/// - `BA_WORKER_MAX_RECONNECTS` (unset or `0` = retry forever)
pub fn load_config() -> Result<WorkerConfig, ConfigError> {
    from_lookup(|key| std::env::var(key).ok())
}

fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<WorkerConfig, ConfigError> {
    let mut config = WorkerConfig::default();

    if let Some(endpoint) = lookup("BA_WORKER_ENDPOINT") {
        config.endpoint = endpoint;
    }
    if let Some(secs) = lookup("BA_WORKER_RECONNECT_SECS") {
        let secs: u64 = secs.parse().map_err(|_| ConfigError::InvalidValue {
            key: "BA_WORKER_RECONNECT_SECS",
            reason: format!("not a number of seconds: {secs}"),
        })?;
        config.reconnect_interval = Duration::from_secs(secs);
    }
    if let Some(max) = lookup("BA_WORKER_MAX_RECONNECTS") {
        let max: u32 = max.parse().map_err(|_| ConfigError::InvalidValue {
            key: "BA_WORKER_MAX_RECONNECTS",
            reason: format!("not a count: {max}"),
        })?;
        config.max_reconnect_attempts = (max > 0).then_some(max);
    }

    config.validate()?;
    Ok(config)
}
