//! Correlation broker - owns the single live channel and the pending waiters.
//!
//! The active connection and the pending table sit behind one mutex, so
//! every mutation (install, retire, register, resolve, expire, drain) is
//! atomic with respect to every other. The lock is never held across an
//! await: callers suspend on their own oneshot receiver.

use crate::domain::{
    BrokerConfig, BrokerError, PendingStatsSnapshot, PendingWaiters, Resolution,
};
use crate::ports::Channel;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use shared_types::{decode_reply, encode, CommandMessage, CorrelationId, Inbound, ResultMessage};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Identifies one installed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An inbound message that did not answer any pending request.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Present when the message carried an id nobody was waiting for.
    pub correlation_id: Option<CorrelationId>,
    pub body: Value,
}

/// What `handle_incoming` did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A pending waiter was resolved.
    Resolved,
    /// Carried an id with no pending waiter; dropped.
    Unmatched,
    /// Carried no id; surfaced as a notification.
    Notification,
    /// Not decodable; dropped.
    Malformed,
    /// Larger than `max_message_size`; dropped undecoded.
    Oversized,
}

struct ActiveConnection {
    id: ConnectionId,
    channel: Arc<dyn Channel>,
}

struct BrokerState {
    connection: Option<ActiveConnection>,
    pending: PendingWaiters,
    next_connection_id: u64,
}

#[derive(Debug, Default)]
struct InboundStats {
    unmatched: AtomicU64,
    notifications: AtomicU64,
    malformed: AtomicU64,
    oversized: AtomicU64,
}

/// Broker statistics for the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BrokerStats {
    pub pending: PendingStatsSnapshot,
    pub unmatched: u64,
    pub notifications: u64,
    pub malformed: u64,
    pub oversized: u64,
}

/// Correlation broker.
///
/// Constructed once per process and shared by `Arc` with the transport
/// adapter and every caller.
pub struct Broker {
    state: Mutex<BrokerState>,
    config: BrokerConfig,
    notifications: broadcast::Sender<Notification>,
    inbound: InboundStats,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        let (notifications, _) = broadcast::channel(config.notification_capacity.max(1));
        Self {
            state: Mutex::new(BrokerState {
                connection: None,
                pending: PendingWaiters::new(),
                next_connection_id: 1,
            }),
            config,
            notifications,
            inbound: InboundStats::default(),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Deadline applied by callers that have no better choice.
    pub fn default_timeout(&self) -> Duration {
        self.config.default_timeout
    }

    /// Install `channel` as the active connection.
    ///
    /// A previously active connection is retired without failing its
    /// waiters; only [`Broker::disconnect`] does that.
    pub fn connect(&self, channel: Arc<dyn Channel>) -> ConnectionId {
        let mut state = self.state.lock();
        let id = ConnectionId(state.next_connection_id);
        state.next_connection_id += 1;

        if let Some(previous) = state.connection.replace(ActiveConnection { id, channel }) {
            info!(
                previous = %previous.id,
                connection = %id,
                pending = state.pending.len(),
                "Retiring previous worker connection"
            );
        } else {
            info!(connection = %id, "Worker connected");
        }
        id
    }

    /// Clear the active connection and fail every pending waiter with
    /// `ConnectionLost`. Idempotent.
    ///
    /// Returns the number of waiters failed.
    pub fn disconnect(&self) -> usize {
        let mut state = self.state.lock();
        let (previous, failed) = Self::disconnect_locked(&mut state);
        drop(state);

        match previous {
            Some(id) => info!(connection = %id, failed, "Worker disconnected"),
            None if failed > 0 => warn!(failed, "Failed waiters with no active connection"),
            None => debug!("Disconnect with no active connection"),
        }
        failed
    }

    /// Disconnect only if `id` is still the active connection.
    ///
    /// Used by the transport when a socket closes, so a retired socket that
    /// closes late cannot tear down its replacement. The check and the
    /// teardown happen under one guard.
    pub fn disconnect_if_current(&self, id: ConnectionId) -> usize {
        let mut state = self.state.lock();
        let is_current = state
            .connection
            .as_ref()
            .is_some_and(|conn| conn.id == id);
        if !is_current {
            drop(state);
            debug!(connection = %id, "Ignoring close of retired connection");
            return 0;
        }

        let (_, failed) = Self::disconnect_locked(&mut state);
        drop(state);
        info!(connection = %id, failed, "Worker disconnected");
        failed
    }

    fn disconnect_locked(state: &mut BrokerState) -> (Option<ConnectionId>, usize) {
        let previous = state.connection.take().map(|conn| conn.id);
        let failed = state.pending.fail_all();
        (previous, failed)
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connection.is_some()
    }

    /// Id of the active connection, if any.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.state.lock().connection.as_ref().map(|conn| conn.id)
    }

    /// Transmit `command` with no correlation id.
    ///
    /// Returns whether the frame was handed to an active channel.
    pub fn send_fire_and_forget(&self, command: &CommandMessage) -> bool {
        let untagged = CommandMessage {
            correlation_id: None,
            ..command.clone()
        };
        let frame = match encode(&untagged) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(action = %command.action, error = %e, "Failed to encode command");
                return false;
            }
        };

        let state = self.state.lock();
        let Some(conn) = state.connection.as_ref() else {
            debug!(action = %command.action, "Fire-and-forget dropped: not connected");
            return false;
        };

        match conn.channel.transmit(frame) {
            Ok(()) => {
                debug!(action = %command.action, connection = %conn.id, "Sent fire-and-forget command");
                true
            }
            Err(e) => {
                warn!(action = %command.action, error = %e, "Fire-and-forget transmit failed");
                false
            }
        }
    }

    /// Tag `command` with a fresh correlation id, transmit it and wait for
    /// the matching reply.
    ///
    /// Exactly one of reply, `Timeout` or `ConnectionLost` is returned, and
    /// the waiter is gone from the pending table on every exit path,
    /// including when the returned future is dropped.
    pub async fn send_and_wait(
        &self,
        command: &CommandMessage,
        timeout: Duration,
    ) -> Result<ResultMessage, BrokerError> {
        let id = CorrelationId::new();
        let frame = encode(&command.tagged(id))?;

        let mut rx = {
            let mut state = self.state.lock();
            let Some(conn) = state.connection.as_ref() else {
                return Err(BrokerError::NotConnected);
            };
            let channel = Arc::clone(&conn.channel);

            let rx = state.pending.register(id, &command.action, timeout)?;
            if let Err(e) = channel.transmit(frame) {
                state.pending.cancel(&id);
                warn!(correlation_id = %id, action = %command.action, error = %e, "Transmit failed");
                return Err(BrokerError::Transmit(e.to_string()));
            }
            rx
        };

        debug!(
            correlation_id = %id,
            action = %command.action,
            timeout_ms = timeout.as_millis() as u64,
            "Sent command, awaiting reply"
        );

        let guard = WaiterGuard { broker: self, id };

        let resolution = match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(resolution)) => resolution,
            // Sender dropped without a resolution: the waiter was torn down.
            Ok(Err(_)) => Resolution::ConnectionLost,
            Err(_) => {
                let expired = self.state.lock().pending.expire(&id);
                if expired.is_some() {
                    warn!(
                        correlation_id = %id,
                        action = %command.action,
                        timeout_ms = timeout.as_millis() as u64,
                        "Timed out waiting for reply"
                    );
                    return Err(BrokerError::Timeout(timeout));
                }
                // The resolver removed the waiter under the lock before we
                // got there, so its resolution is already in the channel.
                match rx.try_recv() {
                    Ok(resolution) => resolution,
                    Err(_) => Resolution::ConnectionLost,
                }
            }
        };
        drop(guard);

        match resolution {
            Resolution::Reply(reply) => Ok(reply),
            Resolution::ConnectionLost => Err(BrokerError::ConnectionLost),
        }
    }

    /// Route one decoded inbound message.
    pub fn handle_incoming(&self, message: ResultMessage) -> Delivery {
        let Some(id) = message.correlation_id else {
            self.notify(None, serde_json::to_value(&message).unwrap_or(Value::Null));
            return Delivery::Notification;
        };

        let unmatched = self.state.lock().pending.resolve(id, message);
        match unmatched {
            Ok(()) => Delivery::Resolved,
            Err(message) => {
                self.inbound.unmatched.fetch_add(1, Ordering::Relaxed);
                warn!(
                    correlation_id = %id,
                    status = %message.status,
                    "Reply for unknown or expired correlation id"
                );
                self.notify(
                    Some(id),
                    serde_json::to_value(&message).unwrap_or(Value::Null),
                );
                Delivery::Unmatched
            }
        }
    }

    /// Decode a text frame and route it.
    ///
    /// Frames over `max_message_size` are counted and dropped without being
    /// parsed; the connection stays up.
    pub fn handle_incoming_frame(&self, frame: &str) -> Delivery {
        if frame.len() > self.config.max_message_size {
            self.inbound.oversized.fetch_add(1, Ordering::Relaxed);
            warn!(
                size = frame.len(),
                max = self.config.max_message_size,
                "Dropping oversized inbound frame"
            );
            return Delivery::Oversized;
        }

        match decode_reply(frame) {
            Ok(Inbound::Reply(message)) => self.handle_incoming(message),
            Ok(Inbound::Notification(body)) => {
                self.notify(None, body);
                Delivery::Notification
            }
            Err(e) => {
                self.inbound.malformed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, len = frame.len(), "Dropping malformed inbound frame");
                Delivery::Malformed
            }
        }
    }

    /// Observe unsolicited messages.
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Get number of currently pending waiters
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Check if a correlation ID is pending
    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.state.lock().pending.contains(id)
    }

    pub fn stats(&self) -> BrokerStats {
        let pending = self.state.lock().pending.stats().snapshot();
        BrokerStats {
            pending,
            unmatched: self.inbound.unmatched.load(Ordering::Relaxed),
            notifications: self.inbound.notifications.load(Ordering::Relaxed),
            malformed: self.inbound.malformed.load(Ordering::Relaxed),
            oversized: self.inbound.oversized.load(Ordering::Relaxed),
        }
    }

    fn notify(&self, correlation_id: Option<CorrelationId>, body: Value) {
        self.inbound.notifications.fetch_add(1, Ordering::Relaxed);
        debug!(correlation_id = ?correlation_id, "Unsolicited message from worker");
        // No subscribers is fine.
        let _ = self.notifications.send(Notification {
            correlation_id,
            body,
        });
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}

/// Removes the waiter if the caller leaves `send_and_wait` early.
struct WaiterGuard<'a> {
    broker: &'a Broker,
    id: CorrelationId,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        if self.broker.state.lock().pending.cancel(&self.id) {
            debug!(correlation_id = %self.id, "Caller dropped, waiter removed");
        }
    }
}
