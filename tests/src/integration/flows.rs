//! # Broker/Worker Flows
//!
//! The broker served by the controller router, the worker connected over a
//! real WebSocket, replies matched by correlation id.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use ba_01_broker::{BrokerError, DEFAULT_MAX_MESSAGE_SIZE};
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use shared_types::{decode_command, CommandMessage, Status};
    use tokio_tungstenite::tungstenite::Message;
    use std::sync::Arc;
    use std::time::Duration;

    // =============================================================================
    // REQUEST / REPLY
    // =============================================================================

    #[tokio::test]
    async fn test_goto_round_trip_over_websocket() {
        let pages = start_page_server().await;
        let controller = Controller::start(Arc::new(Idle)).await;
        let worker = spawn_fetch_worker(controller.agent_endpoint());
        wait_until(|| controller.broker.is_connected()).await;

        let url = format!("{pages}/page/home");
        let reply = controller
            .broker
            .send_and_wait(
                &CommandMessage::new("goto").with_argument("url", url.as_str()),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(reply.status, Status::Success);
        assert_eq!(reply.action.as_deref(), Some("goto"));
        assert_eq!(reply.payload, format!("Navigated to {url}").as_str());
        assert_eq!(controller.broker.pending_count(), 0);

        worker.abort();
        controller.stop().await;
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_matched_by_id() {
        let controller = Controller::start(Arc::new(Idle)).await;
        let worker = spawn_stub_worker(controller.agent_endpoint());
        wait_until(|| controller.broker.is_connected()).await;

        let calls: Vec<_> = (0..16)
            .map(|i| {
                let broker = Arc::clone(&controller.broker);
                tokio::spawn(async move {
                    let command = CommandMessage::new("echo").with_argument("n", i);
                    let reply = broker
                        .send_and_wait(&command, Duration::from_secs(5))
                        .await
                        .unwrap();
                    (i, reply)
                })
            })
            .collect();

        for call in calls {
            let (i, reply) = call.await.unwrap();
            assert_eq!(reply.status, Status::Success);
            assert_eq!(reply.payload["n"], i, "reply cross-matched for request {i}");
        }
        assert_eq!(controller.broker.pending_count(), 0);
        assert_eq!(controller.broker.stats().pending.completed, 16);

        worker.abort();
        controller.stop().await;
    }

    #[tokio::test]
    async fn test_worker_side_errors_are_normal_replies() {
        let controller = Controller::start(Arc::new(Idle)).await;
        let worker = spawn_fetch_worker(controller.agent_endpoint());
        wait_until(|| controller.broker.is_connected()).await;

        let broker = &controller.broker;
        let reply = broker
            .send_and_wait(&CommandMessage::new("fly"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(reply.status, Status::Error);
        assert_eq!(reply.action.as_deref(), Some("unknown"));
        assert_eq!(reply.payload, "Unknown action: fly");

        let reply = broker
            .send_and_wait(&CommandMessage::new("goto"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(reply.status, Status::Error);
        assert_eq!(reply.payload, "Missing URL");

        worker.abort();
        controller.stop().await;
    }

    #[tokio::test]
    async fn test_fire_and_forget_reply_becomes_notification() {
        let controller = Controller::start(Arc::new(Idle)).await;
        let worker = spawn_stub_worker(controller.agent_endpoint());
        wait_until(|| controller.broker.is_connected()).await;

        let mut notifications = controller.broker.subscribe_notifications();
        assert!(controller
            .broker
            .send_fire_and_forget(&CommandMessage::new("echo").with_argument("ping", true)));

        let note = tokio::time::timeout(Duration::from_secs(5), notifications.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(note.correlation_id.is_none());
        assert_eq!(note.body["details"]["ping"], true);
        assert_eq!(controller.broker.pending_count(), 0);

        worker.abort();
        controller.stop().await;
    }

    // =============================================================================
    // DEADLINES
    // =============================================================================

    #[tokio::test]
    async fn test_timeout_removes_waiter_and_late_work_is_ignored() {
        let controller = Controller::start(Arc::new(Idle)).await;
        let worker = spawn_stub_worker(controller.agent_endpoint());
        wait_until(|| controller.broker.is_connected()).await;

        let err = controller
            .broker
            .send_and_wait(&CommandMessage::new("hang"), Duration::from_millis(200))
            .await
            .unwrap_err();

        assert_eq!(err, BrokerError::Timeout(Duration::from_millis(200)));
        assert_eq!(controller.broker.pending_count(), 0);
        assert_eq!(controller.broker.stats().pending.timeouts, 1);

        worker.abort();
        controller.stop().await;
    }

    #[tokio::test]
    async fn test_no_worker_fails_fast() {
        let controller = Controller::start(Arc::new(Idle)).await;

        let err = controller
            .broker
            .send_and_wait(&CommandMessage::new("echo"), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err, BrokerError::NotConnected);
        assert_eq!(controller.broker.stats().pending.registered, 0);

        controller.stop().await;
    }

    // =============================================================================
    // FRAME LIMITS
    // =============================================================================

    #[tokio::test]
    async fn test_oversized_reply_frame_keeps_connection_and_waiter() {
        let controller = Controller::start(Arc::new(Idle)).await;
        let (mut socket, _) = tokio_tungstenite::connect_async(controller.agent_endpoint())
            .await
            .unwrap();
        wait_until(|| controller.broker.is_connected()).await;

        let broker = Arc::clone(&controller.broker);
        let caller = tokio::spawn(async move {
            broker
                .send_and_wait(&CommandMessage::new("goto"), Duration::from_secs(10))
                .await
        });

        let request = loop {
            match socket.next().await.unwrap().unwrap() {
                Message::Text(text) => break decode_command(text.as_str()).unwrap(),
                _ => continue,
            }
        };
        let id = request.correlation_id.unwrap().to_string();

        let oversized = json!({
            "message_id": id,
            "status": "success",
            "details": "x".repeat(2 * DEFAULT_MAX_MESSAGE_SIZE),
        });
        socket.send(Message::text(oversized.to_string())).await.unwrap();

        let reply = json!({ "message_id": id, "status": "success", "details": "small" });
        socket.send(Message::text(reply.to_string())).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), caller)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(result.payload, "small");
        assert!(controller.broker.is_connected());
        assert_eq!(controller.broker.stats().oversized, 1);

        let _ = socket.close(None).await;
        controller.stop().await;
    }
}
