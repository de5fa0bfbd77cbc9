//! Worker error types.

use thiserror::Error;

/// Failure raised by an executor while running one action.
///
/// Everything except `ResourceUnusable` is reported back to the broker as an
/// ordinary error result and the session continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("{reason}")]
    InvalidArguments { action: String, reason: String },

    #[error("{reason}")]
    Failed { action: String, reason: String },

    /// The underlying session is gone; the worker must reconnect.
    #[error("resource unusable: {0}")]
    ResourceUnusable(String),
}

impl ExecutionError {
    pub fn invalid(action: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            action: action.to_string(),
            reason: reason.into(),
        }
    }

    pub fn failed(action: &str, reason: impl ToString) -> Self {
        Self::Failed {
            action: action.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Action name reported in the error reply.
    pub fn reply_action(&self) -> Option<&str> {
        match self {
            ExecutionError::UnknownAction(_) => Some("unknown"),
            ExecutionError::InvalidArguments { action, .. }
            | ExecutionError::Failed { action, .. } => Some(action),
            ExecutionError::ResourceUnusable(_) => None,
        }
    }

    pub fn is_resource_unusable(&self) -> bool {
        matches!(self, ExecutionError::ResourceUnusable(_))
    }
}

/// Errors surfaced by the worker service loop.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("channel failure: {0}")]
    Channel(String),

    #[error("failed to open executor session: {0}")]
    Executor(ExecutionError),

    #[error("gave up after {0} consecutive failed attempts")]
    ReconnectExhausted(u32),
}
