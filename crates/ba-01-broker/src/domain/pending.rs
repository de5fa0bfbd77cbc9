//! Pending waiter table.
//!
//! Maps correlation IDs to callers suspended in `send_and_wait`. The table is
//! not synchronized on its own; the broker keeps it behind the same lock as
//! the active connection so that insert, resolve, remove and drain are
//! mutually exclusive.
//!
//! Flow:
//! 1. Caller generates a `CorrelationId`
//! 2. `register()` hands back a oneshot receiver
//! 3. The tagged command is transmitted
//! 4. Inbound reply calls `resolve()`, or disconnect calls `fail_all()`
//! 5. On timeout the caller calls `expire()`; if the waiter is already gone the
//!    resolution has won and is waiting in the receiver

use shared_types::{CorrelationId, ResultMessage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::debug;

use crate::domain::error::BrokerError;

/// The single resolution a waiter receives.
#[derive(Debug)]
pub enum Resolution {
    /// Matching reply from the worker.
    Reply(ResultMessage),
    /// The connection was dropped while the waiter was pending.
    ConnectionLost,
}

/// A caller awaiting a specific reply.
#[derive(Debug)]
pub struct PendingWaiter {
    sender: oneshot::Sender<Resolution>,
    created_at: Instant,
    deadline: Instant,
    action: String,
}

impl PendingWaiter {
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Deliver the resolution. Returns false if the caller is already gone.
    fn deliver(self, resolution: Resolution) -> bool {
        self.sender.send(resolution).is_ok()
    }
}

/// Counters for the pending table
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total waiters registered
    pub total_registered: AtomicU64,
    /// Total waiters resolved with a reply
    pub total_completed: AtomicU64,
    /// Total waiters that hit their deadline
    pub total_timeouts: AtomicU64,
    /// Total waiters failed by a disconnect
    pub total_connection_lost: AtomicU64,
    /// Total waiters removed because the caller went away
    pub total_cancelled: AtomicU64,
}

/// Point-in-time copy of [`PendingStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PendingStatsSnapshot {
    pub registered: u64,
    pub completed: u64,
    pub timeouts: u64,
    pub connection_lost: u64,
    pub cancelled: u64,
}

impl PendingStats {
    pub fn snapshot(&self) -> PendingStatsSnapshot {
        PendingStatsSnapshot {
            registered: self.total_registered.load(Ordering::Relaxed),
            completed: self.total_completed.load(Ordering::Relaxed),
            timeouts: self.total_timeouts.load(Ordering::Relaxed),
            connection_lost: self.total_connection_lost.load(Ordering::Relaxed),
            cancelled: self.total_cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Correlation ID → waiter table.
#[derive(Debug, Default)]
pub struct PendingWaiters {
    waiters: HashMap<CorrelationId, PendingWaiter>,
    stats: PendingStats,
}

impl PendingWaiters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `id`.
    ///
    /// At most one waiter may exist per id.
    pub fn register(
        &mut self,
        id: CorrelationId,
        action: &str,
        timeout: Duration,
    ) -> Result<oneshot::Receiver<Resolution>, BrokerError> {
        if self.waiters.contains_key(&id) {
            return Err(BrokerError::DuplicateCorrelationId(id));
        }

        let (tx, rx) = oneshot::channel();
        let now = Instant::now();
        self.waiters.insert(
            id,
            PendingWaiter {
                sender: tx,
                created_at: now,
                deadline: now + timeout,
                action: action.to_string(),
            },
        );
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(correlation_id = %id, action = action, "Registered pending waiter");
        Ok(rx)
    }

    /// Resolve the waiter for `id` with a reply and remove it.
    ///
    /// Hands the reply back if no waiter is registered under `id`.
    pub fn resolve(
        &mut self,
        id: CorrelationId,
        reply: ResultMessage,
    ) -> Result<(), ResultMessage> {
        let Some(waiter) = self.waiters.remove(&id) else {
            return Err(reply);
        };

        let action = waiter.action.clone();
        let elapsed = waiter.age();
        if waiter.deliver(Resolution::Reply(reply)) {
            self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
            debug!(
                correlation_id = %id,
                action = %action,
                response_time_ms = elapsed.as_millis() as u64,
                "Resolved pending waiter"
            );
        } else {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %id, action = %action, "Waiter receiver already dropped");
        }
        Ok(())
    }

    /// Remove the waiter for `id` after its deadline passed.
    pub fn expire(&mut self, id: &CorrelationId) -> Option<PendingWaiter> {
        let waiter = self.waiters.remove(id)?;
        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
        Some(waiter)
    }

    /// Remove the waiter for `id` because its caller went away.
    pub fn cancel(&mut self, id: &CorrelationId) -> bool {
        if self.waiters.remove(id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Fail every waiter with `ConnectionLost` and clear the table.
    ///
    /// Returns the number of waiters failed.
    pub fn fail_all(&mut self) -> usize {
        let drained: Vec<_> = self.waiters.drain().collect();
        let count = drained.len();
        for (id, waiter) in drained {
            debug!(correlation_id = %id, action = %waiter.action, "Failing waiter: connection lost");
            waiter.deliver(Resolution::ConnectionLost);
        }
        self.stats
            .total_connection_lost
            .fetch_add(count as u64, Ordering::Relaxed);
        count
    }

    /// Number of outstanding waiters
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Check if a correlation ID is pending
    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.waiters.contains_key(id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}
