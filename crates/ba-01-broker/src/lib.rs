//! BA-01 Correlation Broker - request/reply over a single worker channel.
//!
//! The broker lets many concurrent callers issue commands to one connected
//! worker and wait for the reply that belongs to them.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      BROKER (ba-01)                            │
//! ├───────────────────────────────────────────────────────────────┤
//! │   callers ── send_and_wait ──┐                                 │
//! │                              ▼                                 │
//! │   ┌──────────────────── state lock ────────────────────┐      │
//! │   │  active connection      pending waiters (oneshot)  │      │
//! │   └───────┬────────────────────────────▲───────────────┘      │
//! │           │ transmit                   │ handle_incoming       │
//! │   ┌───────▼────────┐           ┌───────┴────────┐              │
//! │   │  QueueChannel  │           │   read loop    │              │
//! │   │ (writer task)  │           │                │              │
//! │   └───────┬────────┘           └───────▲────────┘              │
//! └───────────┼────────────────────────────┼──────────────────────┘
//!             ▼        WebSocket           │
//!                       worker
//! ```
//!
//! # Guarantees
//!
//! - Every `send_and_wait` ends with exactly one of: the matching reply,
//!   `Timeout`, or `ConnectionLost`.
//! - A waiter never outlives its call, including when the call is dropped.
//! - Replies with unknown ids are dropped; untagged messages become
//!   notifications.
//!
//! # Usage
//!
//! ```ignore
//! use ba_01_broker::{Broker, BrokerConfig};
//! use shared_types::CommandMessage;
//!
//! let broker = Arc::new(Broker::new(BrokerConfig::default()));
//! let reply = broker
//!     .send_and_wait(&CommandMessage::new("goto").with_argument("url", url), timeout)
//!     .await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{AgentSocketHandler, QueueChannel, SocketConfig};
pub use domain::{
    BrokerConfig, BrokerError, ChannelError, ConfigError, PendingStatsSnapshot,
    DEFAULT_MAX_MESSAGE_SIZE,
};
pub use ports::Channel;
pub use service::{Broker, BrokerStats, ConnectionId, Delivery, Notification};
