//! # Browser-Agent Worker
//!
//! Connects to the controller's agent endpoint and executes the commands it
//! receives until stopped.
//!
//! ## Environment
//!
//! - `BA_WORKER_ENDPOINT` (default `ws://backend:8000/ws/agent`)
//! - `BA_WORKER_RECONNECT_SECS` (default `5`)
//! - `BA_WORKER_MAX_RECONNECTS` (default unbounded)
//! - `BA_LOG_LEVEL`, `BA_JSON_LOGS`

use agent_telemetry::{init_logging, TelemetryConfig};
use anyhow::{Context, Result};
use ba_02_worker::{load_config, CommandLoop, FetchExecutorFactory};
use std::time::Duration;
use tracing::info;

/// Per-request limit for page fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&TelemetryConfig::for_service("ba-worker"))?;

    let config = load_config().context("invalid worker configuration")?;
    info!(
        endpoint = %config.endpoint,
        reconnect_interval_ms = config.reconnect_interval.as_millis() as u64,
        max_reconnect_attempts = ?config.max_reconnect_attempts,
        "Starting browser-agent worker"
    );

    let factory = FetchExecutorFactory::new(FETCH_TIMEOUT)
        .context("failed to build HTTP client")?;
    let worker = CommandLoop::new(config, factory);

    tokio::select! {
        result = worker.run() => result.context("worker stopped")?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received");
        }
    }

    info!("Worker stopped");
    Ok(())
}
