//! Domain types for the gateway.

pub mod config;
pub mod error;
pub mod types;

pub use config::{load_config, ConfigError, GatewayConfig, HttpConfig, OpenAiConfig};
pub use error::{ApiError, GatewayError};
pub use types::{CommandRequest, CommandResponse, StepView};
