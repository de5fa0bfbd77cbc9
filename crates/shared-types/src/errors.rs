//! # Error Types
//!
//! Frame-level errors shared by both ends of the channel.

use thiserror::Error;

/// Errors raised while encoding or decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Frame is not valid JSON.
    #[error("Invalid JSON received: {0}")]
    InvalidJson(String),

    /// Frame is JSON but not an object.
    #[error("Frame must be a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field has the wrong type or value.
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Serialization failed on the way out.
    #[error("Encode failed: {0}")]
    Encode(String),
}
