//! Outbound (Driven) ports for the broker.

use crate::domain::ChannelError;

/// The live duplex channel to the worker, send half.
///
/// `transmit` is called while the broker's state lock is held, so
/// implementations must hand the frame off without suspending (typically
/// into a queue drained by a writer task).
pub trait Channel: Send + Sync {
    /// Queue one text frame for delivery.
    fn transmit(&self, frame: String) -> Result<(), ChannelError>;
}
