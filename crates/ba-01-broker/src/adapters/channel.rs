//! Queue-backed [`Channel`].
//!
//! Frames are pushed into an unbounded mpsc queue and a writer task owns the
//! socket sink, so `transmit` never suspends while the broker lock is held.

use crate::domain::ChannelError;
use crate::ports::Channel;
use tokio::sync::mpsc;

/// Send half of an outbound frame queue.
#[derive(Debug, Clone)]
pub struct QueueChannel {
    tx: mpsc::UnboundedSender<String>,
}

impl QueueChannel {
    /// Create a channel and the receiver its writer task drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Channel for QueueChannel {
    fn transmit(&self, frame: String) -> Result<(), ChannelError> {
        self.tx.send(frame).map_err(|_| ChannelError::Closed)
    }
}
