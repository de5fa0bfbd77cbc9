//! Request and response bodies of the command API.

use ba_03_decision_loop::{ActionOutcome, LoopOutcome, Termination};
use serde::{Deserialize, Serialize};
use shared_types::Arguments;

/// `POST /api/agent/command` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub prompt: String,
}

/// One executed action as shown to API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub action: String,
    pub arguments: Arguments,
    pub outcome: ActionOutcome,
}

/// `POST /api/agent/command` success body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResponse {
    pub termination: Termination,
    pub instruction: String,
    pub steps: Vec<StepView>,
    pub notes: Vec<String>,
}

impl From<LoopOutcome> for CommandResponse {
    fn from(outcome: LoopOutcome) -> Self {
        let state = outcome.state;
        Self {
            termination: outcome.termination,
            instruction: state.instruction,
            steps: state
                .records
                .into_iter()
                .map(|record| StepView {
                    action: record.action,
                    arguments: record.arguments,
                    outcome: record.outcome,
                })
                .collect(),
            notes: state.notes.into_iter().map(|note| note.text).collect(),
        }
    }
}
