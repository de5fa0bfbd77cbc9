//! # Agent Telemetry
//!
//! Structured logging for the controller and worker processes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&TelemetryConfig::for_service("ba-worker"))?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BA_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `BA_JSON_LOGS` | `false` (`true` in containers) | JSON formatted output |
//! | `BA_LOG_THREAD_IDS` | `true` | Include thread ids |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}
