use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Decision loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Deadline for each dispatched action
    #[serde(with = "humantime_serde")]
    pub action_timeout: Duration,
    /// Maximum number of act phases before the loop is cut off
    pub max_iterations: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_secs(30),
            max_iterations: 25,
        }
    }
}

impl LoopConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.action_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "action_timeout cannot be 0".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_iterations cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}
