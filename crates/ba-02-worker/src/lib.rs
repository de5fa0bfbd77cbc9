//! BA-02 Worker - executes broker commands against one stateful session.
//!
//! ```text
//!  broker ──ws──▶ read frame ──▶ decode ──▶ Executor::execute ──▶ reply ──ws──▶ broker
//!                     ▲                                              │
//!                     └──────────────── next frame ◀─────────────────┘
//! ```
//!
//! Commands are processed strictly one at a time. Unknown actions and
//! ordinary failures become `status: error` replies; a `ResourceUnusable`
//! failure is replied to and then ends the connection so a fresh session is
//! opened on reconnect. Channel failures are retried after a fixed interval.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{FetchExecutor, FetchExecutorFactory};
pub use domain::{load_config, ConfigError, ExecutionError, WorkerConfig, WorkerError};
pub use ports::{Executor, ExecutorFactory};
pub use service::{CommandLoop, FrameOutcome, SessionEnd};
