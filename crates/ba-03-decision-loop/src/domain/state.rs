//! Accumulated action state.
//!
//! The state only grows: each act phase appends one record per dispatched
//! action, and each decide phase may append a note. Records and notes carry
//! the turn they belong to, the 1-based act phase their decision opened.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{Arguments, CommandMessage, Status};

/// One action proposed by the decision function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    /// Identifier chosen by the decision function, echoed back in the record.
    pub call_id: String,
    /// Worker action name (`goto`, `screenshot`, ...)
    pub action: String,
    pub arguments: Arguments,
}

impl ProposedAction {
    pub fn new(call_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            action: action.into(),
            arguments: Arguments::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// The command sent to the worker for this action.
    pub fn to_command(&self) -> CommandMessage {
        CommandMessage::new(self.action.as_str()).with_arguments(self.arguments.clone())
    }
}

/// Output of one decide phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decision {
    /// Empty means no further action.
    pub actions: Vec<ProposedAction>,
    /// Free-text commentary, kept in the state.
    pub note: Option<String>,
}

impl Decision {
    /// No further action.
    pub fn finish(note: impl Into<String>) -> Self {
        Self {
            actions: Vec::new(),
            note: Some(note.into()),
        }
    }

    pub fn act(actions: Vec<ProposedAction>) -> Self {
        Self {
            actions,
            note: None,
        }
    }

    pub fn is_final(&self) -> bool {
        self.actions.is_empty()
    }
}

/// What came back for a dispatched action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The worker answered; `status` may still be `error`.
    Completed { status: Status, payload: Value },
    /// No answer: not connected, timed out or connection lost.
    Failed { kind: String, message: String },
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Completed { status, .. } if status.is_success())
    }

    /// One-line rendering for the decision function.
    pub fn summary(&self) -> String {
        match self {
            ActionOutcome::Completed { status, payload } => {
                let details = match payload {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("{status}: {details}")
            }
            ActionOutcome::Failed { kind, message } => format!("failed ({kind}): {message}"),
        }
    }
}

/// One executed action and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub turn: u32,
    pub call_id: String,
    pub action: String,
    pub arguments: Arguments,
    pub outcome: ActionOutcome,
}

/// Text the decision function returned with a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub turn: u32,
    pub text: String,
}

/// Everything the loop has done so far for one instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionState {
    pub instruction: String,
    pub records: Vec<ActionRecord>,
    pub notes: Vec<Note>,
}

impl ActionState {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            records: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn record(&mut self, turn: u32, proposed: ProposedAction, outcome: ActionOutcome) {
        self.records.push(ActionRecord {
            turn,
            call_id: proposed.call_id,
            action: proposed.action,
            arguments: proposed.arguments,
            outcome,
        });
    }

    pub fn add_note(&mut self, turn: u32, text: impl Into<String>) {
        self.notes.push(Note {
            turn,
            text: text.into(),
        });
    }

    pub fn last_record(&self) -> Option<&ActionRecord> {
        self.records.last()
    }

    pub fn note_for(&self, turn: u32) -> Option<&str> {
        self.notes
            .iter()
            .find(|note| note.turn == turn)
            .map(|note| note.text.as_str())
    }

    /// Records grouped by the turn that produced them, in order.
    pub fn turns(&self) -> impl Iterator<Item = (u32, &[ActionRecord])> {
        self.records
            .chunk_by(|a, b| a.turn == b.turn)
            .map(|records| (records[0].turn, records))
    }
}
