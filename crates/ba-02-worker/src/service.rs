//! Worker command loop.
//!
//! One connection at a time, one command at a time. Each frame is decoded,
//! dispatched to the executor and answered with a reply carrying the
//! frame's `message_id`. A dead session ends the connection; a dead channel
//! is retried after a fixed interval.

use crate::domain::{ExecutionError, WorkerConfig, WorkerError};
use crate::ports::{Executor, ExecutorFactory};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use shared_types::{decode_command, encode, CodecError, ResultMessage};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, warn};

/// Reply text for a frame that is not JSON at all.
const INVALID_JSON: &str = "Invalid JSON received";

/// Result of handling one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    /// Reply to send back, already encoded.
    pub reply: String,
    /// The executor's session is gone; end the connection after replying.
    pub resource_lost: bool,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The executor reported its resource unusable.
    ResourceLost,
    /// The broker closed the channel.
    ChannelClosed,
}

/// The worker service.
pub struct CommandLoop<F: ExecutorFactory> {
    config: WorkerConfig,
    factory: F,
}

impl<F: ExecutorFactory> CommandLoop<F> {
    pub fn new(config: WorkerConfig, factory: F) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Decode, execute and build the reply for one frame.
    pub async fn process_frame(executor: &mut F::Executor, frame: &str) -> FrameOutcome {
        let command = match decode_command(frame) {
            Ok(command) => command,
            Err(malformed) => {
                let details = match &malformed.error {
                    CodecError::InvalidJson(_) => INVALID_JSON.to_string(),
                    other => other.to_string(),
                };
                warn!(error = %malformed.error, "Rejecting malformed command frame");
                let reply = ResultMessage::error(malformed.correlation_id, None, details);
                return FrameOutcome {
                    reply: encode_reply(&reply),
                    resource_lost: false,
                };
            }
        };

        let id = command.correlation_id;
        debug!(correlation_id = ?id, action = %command.action, "Received command");

        let (reply, resource_lost) = match executor.execute(&command).await {
            Ok(details) => (ResultMessage::success(id, command.action.as_str(), details), false),
            Err(e) => {
                let resource_lost = e.is_resource_unusable();
                if resource_lost {
                    error!(correlation_id = ?id, action = %command.action, error = %e, "Session lost");
                } else {
                    warn!(correlation_id = ?id, action = %command.action, error = %e, "Command failed");
                }
                let action = match &e {
                    ExecutionError::ResourceUnusable(_) => Some(command.action.clone()),
                    other => other.reply_action().map(str::to_string),
                };
                (ResultMessage::error(id, action, e.to_string()), resource_lost)
            }
        };

        debug!(correlation_id = ?id, status = %reply.status, "Command finished");
        FrameOutcome {
            reply: encode_reply(&reply),
            resource_lost,
        }
    }

    /// Serve one connected socket until the channel closes or the session
    /// dies.
    pub async fn run_session<S>(
        &self,
        executor: &mut F::Executor,
        socket: S,
    ) -> Result<SessionEnd, WorkerError>
    where
        S: Stream<Item = Result<Message, tungstenite::Error>>
            + Sink<Message, Error = tungstenite::Error>
            + Unpin,
    {
        let (mut write, mut read) = socket.split();

        while let Some(message) = read.next().await {
            let message = message.map_err(|e| WorkerError::Channel(e.to_string()))?;
            let text = match message {
                Message::Text(text) => text.as_str().to_owned(),
                Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("Ignoring non-UTF-8 binary frame");
                        continue;
                    }
                },
                Message::Close(_) => {
                    info!("Broker closed the channel");
                    return Ok(SessionEnd::ChannelClosed);
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            let outcome = if text.len() > self.config.max_frame_size {
                warn!(size = text.len(), max = self.config.max_frame_size, "Frame too large");
                let details = format!(
                    "Message too large: {} bytes (max: {})",
                    text.len(),
                    self.config.max_frame_size
                );
                FrameOutcome {
                    reply: encode_reply(&ResultMessage::error(None, None, details)),
                    resource_lost: false,
                }
            } else {
                Self::process_frame(executor, &text).await
            };

            write
                .send(Message::text(outcome.reply))
                .await
                .map_err(|e| WorkerError::Channel(e.to_string()))?;

            if outcome.resource_lost {
                let _ = write.close().await;
                return Ok(SessionEnd::ResourceLost);
            }
        }

        info!("Channel stream ended");
        Ok(SessionEnd::ChannelClosed)
    }

    /// Connect, serve and reconnect until the attempt cap (if any) is hit.
    ///
    /// With no cap this never returns.
    pub async fn run(&self) -> Result<(), WorkerError> {
        let mut failures: u32 = 0;

        loop {
            match self.connect_and_serve().await {
                Ok(SessionEnd::ResourceLost) => {
                    failures = 0;
                    info!("Session lost, reconnecting with a fresh session");
                    continue;
                }
                Ok(SessionEnd::ChannelClosed) => {
                    failures = 0;
                    info!(
                        retry_in_ms = self.config.reconnect_interval.as_millis() as u64,
                        "Channel closed, reconnecting"
                    );
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        error = %e,
                        attempt = failures,
                        retry_in_ms = self.config.reconnect_interval.as_millis() as u64,
                        "Connection to broker failed"
                    );
                    if let Some(max) = self.config.max_reconnect_attempts {
                        if failures >= max {
                            error!(attempts = failures, "Giving up on broker connection");
                            return Err(WorkerError::ReconnectExhausted(failures));
                        }
                    }
                }
            }

            tokio::time::sleep(self.config.reconnect_interval).await;
        }
    }

    async fn connect_and_serve(&self) -> Result<SessionEnd, WorkerError> {
        let (socket, _) =
            connect_async(self.config.endpoint.as_str())
                .await
                .map_err(|e| WorkerError::Connect {
                    endpoint: self.config.endpoint.clone(),
                    reason: e.to_string(),
                })?;
        info!(endpoint = %self.config.endpoint, "Connected to broker");

        let mut executor = self.factory.open().await.map_err(WorkerError::Executor)?;
        debug!("Executor session opened");

        let result = self.run_session(&mut executor, socket).await;
        executor.shutdown().await;
        result
    }
}

fn encode_reply(reply: &ResultMessage) -> String {
    encode(reply).unwrap_or_else(|e| {
        error!(error = %e, "Failed to encode reply");
        r#"{"message_id":null,"status":"error","details":"reply encoding failed"}"#.to_string()
    })
}
