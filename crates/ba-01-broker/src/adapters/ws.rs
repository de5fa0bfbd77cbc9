//! WebSocket adapter for the worker connection.
//!
//! Each accepted socket is split: a writer task drains the [`QueueChannel`]
//! installed in the broker, and the read loop feeds text frames to
//! [`Broker::handle_incoming_frame`]. When the socket closes the broker is
//! disconnected, unless a newer socket has already replaced this one.
//!
//! The transport limit is set well above the broker's `max_message_size`:
//! a frame between the two is dropped by the broker and the socket stays
//! up. Only a frame beyond the transport limit ends the connection.

use crate::adapters::QueueChannel;
use crate::service::{Broker, ConnectionId, Delivery};
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Transport limit as a multiple of the broker's message limit.
pub const TRANSPORT_HEADROOM: usize = 16;

/// Per-socket limits.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Largest frame the WebSocket layer accepts before failing the socket
    pub transport_limit: usize,
}

impl SocketConfig {
    pub fn from_broker(broker: &Broker) -> Self {
        Self {
            transport_limit: broker
                .config()
                .max_message_size
                .saturating_mul(TRANSPORT_HEADROOM),
        }
    }
}

/// Drives one worker socket against the broker.
pub struct AgentSocketHandler {
    broker: Arc<Broker>,
    config: SocketConfig,
}

impl AgentSocketHandler {
    pub fn new(broker: Arc<Broker>) -> Self {
        let config = SocketConfig::from_broker(&broker);
        Self { broker, config }
    }

    pub fn with_config(broker: Arc<Broker>, config: SocketConfig) -> Self {
        Self { broker, config }
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Serve `socket` until either side closes it.
    pub async fn handle(self, socket: WebSocket) {
        let (sink, mut stream) = socket.split();
        let (channel, queue) = QueueChannel::new();
        let connection = self.broker.connect(Arc::new(channel));

        let mut writer = tokio::spawn(write_frames(connection, sink, queue));

        loop {
            tokio::select! {
                frame = stream.next() => {
                    let Some(frame) = frame else {
                        debug!(connection = %connection, "Worker stream ended");
                        break;
                    };
                    match frame {
                        Ok(Message::Text(text)) => self.on_text(connection, &text),
                        Ok(Message::Binary(data)) => match String::from_utf8(data) {
                            Ok(text) => self.on_text(connection, &text),
                            Err(_) => warn!(connection = %connection, "Dropping non-UTF-8 binary frame"),
                        },
                        Ok(Message::Close(_)) => {
                            info!(connection = %connection, "Worker closed the socket");
                            break;
                        }
                        // Pings are answered by axum.
                        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                        Err(e) => {
                            warn!(connection = %connection, error = %e, "Worker socket error");
                            break;
                        }
                    }
                }
                _ = &mut writer => {
                    debug!(connection = %connection, "Writer finished, closing read side");
                    break;
                }
            }
        }

        writer.abort();
        let failed = self.broker.disconnect_if_current(connection);
        if failed > 0 {
            info!(connection = %connection, failed, "Failed pending requests on close");
        }
    }

    fn on_text(&self, connection: ConnectionId, text: &str) {
        match self.broker.handle_incoming_frame(text) {
            Delivery::Malformed => debug!(connection = %connection, "Malformed frame from worker"),
            Delivery::Oversized => debug!(
                connection = %connection,
                size = text.len(),
                transport_limit = self.config.transport_limit,
                "Oversized frame from worker dropped"
            ),
            _ => {}
        }
    }
}

/// Forward queued frames to the socket. Ends when the broker drops the
/// channel (disconnect or replacement) or the socket stops accepting writes.
async fn write_frames(
    connection: ConnectionId,
    mut sink: SplitSink<WebSocket, Message>,
    mut queue: mpsc::UnboundedReceiver<String>,
) {
    while let Some(frame) = queue.recv().await {
        if let Err(e) = sink.send(Message::Text(frame)).await {
            error!(connection = %connection, error = %e, "Failed to write frame to worker");
            return;
        }
    }
    debug!(connection = %connection, "Outbound queue closed");
    let _ = sink.send(Message::Close(None)).await;
}
