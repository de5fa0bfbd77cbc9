//! Ports for the decision loop.

pub mod outbound;

pub use outbound::{ActionDispatcher, DecisionFunction};
