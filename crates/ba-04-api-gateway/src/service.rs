//! API Gateway service - HTTP surface of the controller.
//!
//! One listener serves the command API, the admin view and the worker
//! WebSocket endpoint.

use crate::domain::{ApiError, CommandRequest, CommandResponse, GatewayConfig, GatewayError};
use axum::{
    extract::{rejection::JsonRejection, ws::WebSocketUpgrade, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use ba_01_broker::{AgentSocketHandler, Broker};
use ba_03_decision_loop::{DecisionFunction, DecisionLoop, LoopError};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    broker: Arc<Broker>,
    decision_loop: Arc<DecisionLoop>,
}

impl AppState {
    pub fn new(broker: Arc<Broker>, decision_loop: Arc<DecisionLoop>) -> Self {
        Self {
            broker,
            decision_loop,
        }
    }
}

/// Build the gateway router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/agent/command", post(handle_command))
        .route("/ws/agent", get(handle_agent_socket))
        .route("/admin/pending", get(handle_pending))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The controller process: broker, decision loop and HTTP server.
pub struct GatewayService {
    config: GatewayConfig,
    broker: Arc<Broker>,
    decision_loop: Arc<DecisionLoop>,
}

impl GatewayService {
    pub fn new(
        config: GatewayConfig,
        decision: Arc<dyn DecisionFunction>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let broker = Arc::new(Broker::new(config.broker.clone()));
        let decision_loop = Arc::new(DecisionLoop::new(
            broker.clone(),
            decision,
            config.decision_loop.clone(),
        ));

        Ok(Self {
            config,
            broker,
            decision_loop,
        })
    }

    pub fn broker(&self) -> Arc<Broker> {
        Arc::clone(&self.broker)
    }

    pub fn router(&self) -> Router {
        build_router(AppState::new(
            Arc::clone(&self.broker),
            Arc::clone(&self.decision_loop),
        ))
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn serve<S>(self, shutdown: S) -> Result<(), GatewayError>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on<S>(self, listener: TcpListener, shutdown: S) -> Result<(), GatewayError>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(addr = %addr, "Starting API Gateway");

        let router = self.router();
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await;

        let failed = self.broker.disconnect();
        if failed > 0 {
            warn!(failed, "Failed pending requests during shutdown");
        }
        if let Err(e) = &result {
            error!(error = %e, "HTTP server error");
        }
        info!("API Gateway stopped");
        result.map_err(GatewayError::from)
    }
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Run one instruction through the decision loop
async fn handle_command(
    State(state): State<AppState>,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::bad_request("Prompt cannot be empty"));
    }
    if !state.broker.is_connected() {
        return Err(ApiError::service_unavailable("Browser agent is not connected"));
    }

    info!(prompt_len = prompt.len(), "Received agent command");
    match state.decision_loop.run(prompt).await {
        Ok(outcome) => Ok(Json(CommandResponse::from(outcome))),
        Err(LoopError::EmptyInstruction) => Err(ApiError::bad_request("Prompt cannot be empty")),
        Err(LoopError::Decision(e)) => {
            error!(error = %e, "Agent run failed");
            Err(ApiError::internal(e.to_string()))
        }
    }
}

/// Worker WebSocket endpoint
async fn handle_agent_socket(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let handler = AgentSocketHandler::new(state.broker);
    let limit = handler.config().transport_limit;
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| handler.handle(socket))
}

/// Pending request view for operators
async fn handle_pending(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "connected": state.broker.is_connected(),
        "pending": state.broker.pending_count(),
        "stats": state.broker.stats(),
    }))
}
