//! JSON text-frame codec.

use crate::correlation::CorrelationId;
use crate::errors::CodecError;
use crate::messages::{CommandMessage, ResultMessage};
use serde::Serialize;
use serde_json::Value;

/// Serialize any message into a text frame.
pub fn encode<T: Serialize>(message: &T) -> Result<String, CodecError> {
    serde_json::to_string(message).map_err(|e| CodecError::Encode(e.to_string()))
}

/// A command frame that could not be decoded.
///
/// Carries the `message_id` when one could be recovered, so the error reply
/// can still be matched by the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedFrame {
    pub error: CodecError,
    pub correlation_id: Option<CorrelationId>,
}

impl MalformedFrame {
    fn untagged(error: CodecError) -> Self {
        Self {
            error,
            correlation_id: None,
        }
    }
}

/// Decode a command frame received by the worker.
pub fn decode_command(frame: &str) -> Result<CommandMessage, MalformedFrame> {
    let value: Value = serde_json::from_str(frame)
        .map_err(|e| MalformedFrame::untagged(CodecError::InvalidJson(e.to_string())))?;

    let Some(object) = value.as_object() else {
        return Err(MalformedFrame::untagged(CodecError::NotAnObject));
    };

    let raw_id = object.get("message_id").filter(|v| !v.is_null());
    let correlation_id = match raw_id {
        None => None,
        Some(raw) => match raw.as_str().map(CorrelationId::parse) {
            Some(Ok(id)) => Some(id),
            _ => {
                return Err(MalformedFrame::untagged(CodecError::InvalidField {
                    field: "message_id",
                    reason: format!("not a correlation id: {}", raw),
                }))
            }
        },
    };

    let tagged = |error| MalformedFrame {
        error,
        correlation_id,
    };

    match object.get("action") {
        None | Some(Value::Null) => return Err(tagged(CodecError::MissingField("action"))),
        Some(Value::String(_)) => {}
        Some(other) => {
            return Err(tagged(CodecError::InvalidField {
                field: "action",
                reason: format!("expected string, got {}", other),
            }))
        }
    }

    serde_json::from_value(value).map_err(|e| {
        tagged(CodecError::InvalidField {
            field: "arguments",
            reason: e.to_string(),
        })
    })
}

/// A frame received by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Well-formed result; may or may not carry a correlation id.
    Reply(ResultMessage),
    /// Any other JSON the worker chose to send.
    Notification(Value),
}

/// Decode a frame received by the controller.
///
/// Only non-JSON input is an error; JSON that is not shaped like a result is
/// surfaced as a notification.
pub fn decode_reply(frame: &str) -> Result<Inbound, CodecError> {
    let value: Value =
        serde_json::from_str(frame).map_err(|e| CodecError::InvalidJson(e.to_string()))?;

    if value.get("status").is_none() {
        return Ok(Inbound::Notification(value));
    }

    match serde_json::from_value::<ResultMessage>(value.clone()) {
        Ok(reply) => Ok(Inbound::Reply(reply)),
        Err(_) => Ok(Inbound::Notification(value)),
    }
}
