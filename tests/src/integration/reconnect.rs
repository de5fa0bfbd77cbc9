//! # Connection Loss and Reconnect
//!
//! Losing the worker fails outstanding requests immediately. A worker whose
//! session becomes unusable reconnects and serves again.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use ba_01_broker::BrokerError;
    use shared_types::{CommandMessage, Status};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_worker_loss_fails_pending_then_new_worker_serves() {
        let controller = Controller::start(Arc::new(Idle)).await;
        let worker = spawn_stub_worker(controller.agent_endpoint());
        wait_until(|| controller.broker.is_connected()).await;

        let broker = Arc::clone(&controller.broker);
        let waiting = tokio::spawn(async move {
            broker
                .send_and_wait(&CommandMessage::new("hang"), Duration::from_secs(30))
                .await
        });
        wait_until(|| controller.broker.pending_count() == 1).await;

        worker.abort();
        let err = tokio::time::timeout(Duration::from_secs(5), waiting)
            .await
            .expect("waiter released well before its deadline")
            .unwrap()
            .unwrap_err();
        assert_eq!(err, BrokerError::ConnectionLost);
        assert_eq!(controller.broker.pending_count(), 0);
        assert!(!controller.broker.is_connected());

        let worker = spawn_stub_worker(controller.agent_endpoint());
        wait_until(|| controller.broker.is_connected()).await;
        let reply = controller
            .broker
            .send_and_wait(
                &CommandMessage::new("echo").with_argument("again", true),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(reply.status, Status::Success);
        assert_eq!(reply.payload["again"], true);

        worker.abort();
        controller.stop().await;
    }

    #[tokio::test]
    async fn test_unusable_session_triggers_reconnect() {
        let pages = start_page_server().await;
        let controller = Controller::start(Arc::new(Idle)).await;
        let worker = spawn_fetch_worker(controller.agent_endpoint());
        wait_until(|| controller.broker.is_connected()).await;
        let first = controller.broker.connection_id();

        let broker = &controller.broker;
        let reply = broker
            .send_and_wait(&CommandMessage::new("close"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(reply.status, Status::Success);

        let url = format!("{pages}/page/after");
        let goto = CommandMessage::new("goto").with_argument("url", url.as_str());
        let reply = broker
            .send_and_wait(&goto, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(reply.status, Status::Error);
        assert_eq!(reply.action.as_deref(), Some("goto"));
        assert!(reply.payload.as_str().unwrap().contains("Target closed"));

        wait_until(|| broker.is_connected() && broker.connection_id() != first).await;

        let reply = broker
            .send_and_wait(&goto, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(reply.status, Status::Success);
        assert_eq!(reply.payload, format!("Navigated to {url}").as_str());

        worker.abort();
        controller.stop().await;
    }
}
