//! Command and result messages.
//!
//! Command arguments travel flattened into the top-level object
//! (`{"action":"goto","url":"..."}`); a nested `"arguments"` object is also
//! accepted on decode and merged into the same map.

use crate::correlation::CorrelationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form action arguments.
pub type Arguments = serde_json::Map<String, Value>;

/// Keys owned by the envelope; they never appear inside `arguments`.
const RESERVED_KEYS: [&str; 3] = ["action", "message_id", "arguments"];

/// A command for the worker.
///
/// `correlation_id == None` means fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "CommandWire", from = "CommandWire")]
pub struct CommandMessage {
    pub action: String,
    pub arguments: Arguments,
    pub correlation_id: Option<CorrelationId>,
}

impl CommandMessage {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            arguments: Arguments::new(),
            correlation_id: None,
        }
    }

    /// Add a single argument.
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Replace the argument map.
    pub fn with_arguments(mut self, arguments: Arguments) -> Self {
        self.arguments = arguments;
        self
    }

    /// Copy of this command tagged with `id`.
    pub fn tagged(&self, id: CorrelationId) -> Self {
        Self {
            correlation_id: Some(id),
            ..self.clone()
        }
    }

    /// String argument lookup.
    pub fn str_argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

#[derive(Serialize, Deserialize)]
struct CommandWire {
    action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message_id: Option<CorrelationId>,
    #[serde(flatten)]
    arguments: Arguments,
}

impl From<CommandMessage> for CommandWire {
    fn from(command: CommandMessage) -> Self {
        let arguments = command
            .arguments
            .into_iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .collect();
        Self {
            action: command.action,
            message_id: command.correlation_id,
            arguments,
        }
    }
}

impl From<CommandWire> for CommandMessage {
    fn from(wire: CommandWire) -> Self {
        let mut arguments = wire.arguments;
        if let Some(Value::Object(nested)) = arguments.remove("arguments") {
            for (key, value) in nested {
                arguments.entry(key).or_insert(value);
            }
        }
        Self {
            action: wire.action,
            arguments,
            correlation_id: wire.message_id,
        }
    }
}

/// Outcome status of an executed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// Reply from the worker, tagged with the id of the command it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    #[serde(rename = "message_id", default)]
    pub correlation_id: Option<CorrelationId>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(rename = "details", alias = "payload", default)]
    pub payload: Value,
}

impl ResultMessage {
    pub fn success(
        correlation_id: Option<CorrelationId>,
        action: impl Into<String>,
        payload: impl Into<Value>,
    ) -> Self {
        Self {
            correlation_id,
            status: Status::Success,
            action: Some(action.into()),
            payload: payload.into(),
        }
    }

    pub fn error(
        correlation_id: Option<CorrelationId>,
        action: Option<String>,
        payload: impl Into<Value>,
    ) -> Self {
        Self {
            correlation_id,
            status: Status::Error,
            action,
            payload: payload.into(),
        }
    }
}
