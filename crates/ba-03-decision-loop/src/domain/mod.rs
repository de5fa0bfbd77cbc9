//! Domain types for the decision loop.

pub mod config;
pub mod error;
pub mod state;

pub use config::{ConfigError, LoopConfig};
pub use error::{DecisionError, LoopError};
pub use state::{ActionOutcome, ActionRecord, ActionState, Decision, Note, ProposedAction};
