//! # Browser-Agent Controller
//!
//! Serves the command API and accepts the browser worker's WebSocket.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging
//! 2. Load configuration from the environment (`OPENAI_API_KEY` is required)
//! 3. Build the decision function, broker and decision loop
//! 4. Serve until Ctrl+C, then fail any outstanding requests

use agent_telemetry::{init_logging, TelemetryConfig};
use anyhow::{Context, Result};
use ba_04_api_gateway::{load_config, GatewayService, OpenAiDecisionFunction};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&TelemetryConfig::for_service("ba-controller"))?;

    let config = load_config().context("invalid controller configuration")?;
    info!(
        addr = %config.http_addr(),
        model = %config.openai.model,
        action_timeout_ms = config.decision_loop.action_timeout.as_millis() as u64,
        max_iterations = config.decision_loop.max_iterations,
        "Starting browser-agent controller"
    );

    let decision = OpenAiDecisionFunction::new(config.openai.clone())
        .context("failed to build decision service client")?;
    let service = GatewayService::new(config, Arc::new(decision))?;

    service
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
