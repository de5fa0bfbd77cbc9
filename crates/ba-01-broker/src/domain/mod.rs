//! Domain types for the broker.
//!
//! Configuration, errors and the pending waiter table. The table itself holds
//! no lock; synchronization lives in [`crate::service::Broker`].

pub mod config;
pub mod error;
pub mod pending;

pub use config::{BrokerConfig, ConfigError, DEFAULT_MAX_MESSAGE_SIZE};
pub use error::{BrokerError, ChannelError};
pub use pending::{PendingStats, PendingStatsSnapshot, PendingWaiters, Resolution};
