//! # Shared Types Crate
//!
//! Wire model for the agent channel between the controller (broker side) and
//! the remote worker.
//!
//! ## Frames
//!
//! Every frame is a JSON object sent as a WebSocket text message.
//!
//! ```text
//! controller ──► worker   {"action":"goto","url":"https://example.com","message_id":"<uuid>"}
//! worker ──► controller   {"message_id":"<uuid>","status":"success","action":"goto","details":"..."}
//! ```
//!
//! - A command without `message_id` is fire-and-forget.
//! - A reply is matched to its request solely by `message_id`.

pub mod codec;
pub mod correlation;
pub mod errors;
pub mod messages;

pub use codec::{decode_command, decode_reply, encode, Inbound, MalformedFrame};
pub use correlation::CorrelationId;
pub use errors::CodecError;
pub use messages::{Arguments, CommandMessage, ResultMessage, Status};
