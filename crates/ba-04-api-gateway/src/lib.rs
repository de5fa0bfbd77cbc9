//! BA-04 API Gateway - the controller's HTTP surface.
//!
//! ```text
//!  client ──POST /api/agent/command──▶ DecisionLoop ──▶ Broker ──/ws/agent──▶ worker
//!                                          │
//!                                          ▼
//!                                  OpenAiDecisionFunction
//! ```
//!
//! # Endpoints
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health` | Liveness |
//! | `POST /api/agent/command` | Run one instruction (`{"prompt": "..."}`) |
//! | `GET /ws/agent` | Worker WebSocket |
//! | `GET /admin/pending` | Connection state and broker counters |
//!
//! Empty prompts are rejected with 400, a missing worker yields 503, and a
//! failing decision service yields 500 with its error text.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod service;

pub use adapters::OpenAiDecisionFunction;
pub use domain::{load_config, ApiError, ConfigError, GatewayConfig, GatewayError};
pub use service::{build_router, AppState, GatewayService};
