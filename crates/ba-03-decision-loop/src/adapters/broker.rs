//! The correlation broker as an [`ActionDispatcher`].

use crate::ports::ActionDispatcher;
use async_trait::async_trait;
use ba_01_broker::{Broker, BrokerError};
use shared_types::{CommandMessage, ResultMessage};
use std::time::Duration;

#[async_trait]
impl ActionDispatcher for Broker {
    async fn send_and_wait(
        &self,
        command: &CommandMessage,
        timeout: Duration,
    ) -> Result<ResultMessage, BrokerError> {
        Broker::send_and_wait(self, command, timeout).await
    }

    fn is_connected(&self) -> bool {
        Broker::is_connected(self)
    }
}
