//! Outbound (Driven) ports for the decision loop.

use crate::domain::{ActionState, Decision, DecisionError};
use async_trait::async_trait;
use ba_01_broker::BrokerError;
use shared_types::{CommandMessage, ResultMessage};
use std::time::Duration;

/// External policy choosing the next actions.
///
/// May be remote and slow; every call is fallible.
#[async_trait]
pub trait DecisionFunction: Send + Sync {
    /// Propose the next actions given everything done so far.
    ///
    /// An empty `actions` list ends the loop.
    async fn decide(&self, state: &ActionState) -> Result<Decision, DecisionError>;
}

/// Sends one command to the worker and waits for its reply.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn send_and_wait(
        &self,
        command: &CommandMessage,
        timeout: Duration,
    ) -> Result<ResultMessage, BrokerError>;

    /// Whether a worker is currently attached.
    fn is_connected(&self) -> bool;
}
