//! Executor implementations.

pub mod fetch;

pub use fetch::{FetchExecutor, FetchExecutorFactory, DEFAULT_SCREENSHOT_PATH};
