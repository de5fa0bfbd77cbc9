//! Domain types for the worker.

pub mod config;
pub mod error;

pub use config::{load_config, ConfigError, WorkerConfig, DEFAULT_ENDPOINT};
pub use error::{ExecutionError, WorkerError};
