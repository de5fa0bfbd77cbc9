//! Decision loop errors.

use thiserror::Error;

/// Failure of the external decision function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    /// The decision service could not be reached or returned a failure status.
    #[error("decision service unavailable: {0}")]
    Unavailable(String),

    /// The decision service answered with something we cannot interpret.
    #[error("invalid decision response: {0}")]
    InvalidResponse(String),
}

/// Fatal loop errors. Action failures are never fatal; they are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoopError {
    #[error("instruction is empty")]
    EmptyInstruction,

    #[error(transparent)]
    Decision(#[from] DecisionError),
}
