//! BA-03 Decision Loop - alternates between deciding and acting.
//!
//! The loop asks a [`DecisionFunction`](ports::DecisionFunction) for the next
//! actions, dispatches each through an
//! [`ActionDispatcher`](ports::ActionDispatcher) (normally the correlation
//! broker), records the outcome and asks again. It ends when no action is
//! proposed or the configured iteration cap is reached.
//!
//! Transport failures (`not_connected`, `timeout`, `connection_lost`) are
//! folded into the state so the decision function can react to them. A
//! failing decision function is the only fatal error.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(test)]
mod testing;

pub use domain::{
    ActionOutcome, ActionRecord, ActionState, ConfigError, Decision, DecisionError, LoopConfig,
    LoopError, Note, ProposedAction,
};
pub use ports::{ActionDispatcher, DecisionFunction};
pub use service::{DecisionLoop, LoopOutcome, Termination};
