//! Ports for the broker.
//!
//! - `outbound`: the channel the broker writes frames into

pub mod outbound;

pub use outbound::Channel;
