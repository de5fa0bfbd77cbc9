//! Broker error types.
//!
//! `NotConnected`, `Timeout` and `ConnectionLost` are the transport-level
//! outcomes a `send_and_wait` caller must be prepared to handle; none of them
//! is retried by the broker.

use shared_types::{CodecError, CorrelationId};
use std::time::Duration;

/// Errors returned by broker operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// No channel is installed; nothing was registered or sent.
    #[error("no worker connected")]
    NotConnected,

    /// No reply arrived before the deadline.
    #[error("timed out after {}ms waiting for a reply", .0.as_millis())]
    Timeout(Duration),

    /// The connection went away while the request was outstanding.
    #[error("connection lost while waiting for a reply")]
    ConnectionLost,

    /// The active channel refused the frame.
    #[error("transmit failed: {0}")]
    Transmit(String),

    /// The command could not be serialized.
    #[error("encode failed: {0}")]
    Encode(#[from] CodecError),

    /// A waiter with this id is already registered.
    #[error("duplicate correlation id {0}")]
    DuplicateCorrelationId(CorrelationId),
}

impl BrokerError {
    /// Short machine-readable kind, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            BrokerError::NotConnected => "not_connected",
            BrokerError::Timeout(_) => "timeout",
            BrokerError::ConnectionLost => "connection_lost",
            BrokerError::Transmit(_) => "transmit",
            BrokerError::Encode(_) => "encode",
            BrokerError::DuplicateCorrelationId(_) => "duplicate_id",
        }
    }
}

/// Errors raised by a channel implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,

    #[error("channel rejected frame: {0}")]
    Rejected(String),
}
