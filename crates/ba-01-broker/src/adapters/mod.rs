//! Adapters connecting the broker to a real transport.

pub mod channel;
pub mod ws;

pub use channel::QueueChannel;
pub use ws::{AgentSocketHandler, SocketConfig};
