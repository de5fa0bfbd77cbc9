//! Scripted ports for unit tests.

use crate::domain::{ActionState, Decision, DecisionError};
use crate::ports::{ActionDispatcher, DecisionFunction};
use async_trait::async_trait;
use ba_01_broker::BrokerError;
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{CommandMessage, ResultMessage, Status};
use std::collections::VecDeque;
use std::time::Duration;

/// Returns pre-scripted decisions in order and remembers every state it saw.
pub struct ScriptedDecision {
    script: Mutex<VecDeque<Result<Decision, DecisionError>>>,
    repeat: Option<Decision>,
    seen: Mutex<Vec<ActionState>>,
}

impl ScriptedDecision {
    pub fn new(script: Vec<Result<Decision, DecisionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            repeat: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Always return `decision`.
    pub fn repeating(decision: Decision) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            repeat: Some(decision),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<ActionState> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl DecisionFunction for ScriptedDecision {
    async fn decide(&self, state: &ActionState) -> Result<Decision, DecisionError> {
        self.seen.lock().push(state.clone());
        if let Some(next) = self.script.lock().pop_front() {
            return next;
        }
        match &self.repeat {
            Some(decision) => Ok(decision.clone()),
            None => Err(DecisionError::InvalidResponse("script exhausted".into())),
        }
    }
}

enum Mode {
    Echo,
    Reply(Status, Value),
    Fail(Mutex<VecDeque<BrokerError>>),
}

/// Answers every command without a worker.
pub struct ScriptedDispatcher {
    mode: Mode,
    sent: Mutex<Vec<CommandMessage>>,
    timeouts: Mutex<Vec<Duration>>,
}

impl ScriptedDispatcher {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            sent: Mutex::new(Vec::new()),
            timeouts: Mutex::new(Vec::new()),
        }
    }

    /// Succeed with the command's arguments as payload.
    pub fn echoing() -> Self {
        Self::with_mode(Mode::Echo)
    }

    pub fn replying(status: Status, payload: impl Into<Value>) -> Self {
        Self::with_mode(Mode::Reply(status, payload.into()))
    }

    /// Fail with each error in turn, then `NotConnected`.
    pub fn failing_with(errors: Vec<BrokerError>) -> Self {
        Self::with_mode(Mode::Fail(Mutex::new(errors.into())))
    }

    pub fn sent(&self) -> Vec<CommandMessage> {
        self.sent.lock().clone()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().clone()
    }
}

#[async_trait]
impl ActionDispatcher for ScriptedDispatcher {
    async fn send_and_wait(
        &self,
        command: &CommandMessage,
        timeout: Duration,
    ) -> Result<ResultMessage, BrokerError> {
        self.sent.lock().push(command.clone());
        self.timeouts.lock().push(timeout);

        let reply = |status: Status, payload: Value| ResultMessage {
            correlation_id: None,
            status,
            action: Some(command.action.clone()),
            payload,
        };
        match &self.mode {
            Mode::Echo => Ok(reply(
                Status::Success,
                Value::Object(command.arguments.clone()),
            )),
            Mode::Reply(status, payload) => Ok(reply(*status, payload.clone())),
            Mode::Fail(errors) => Err(errors.lock().pop_front().unwrap_or(BrokerError::NotConnected)),
        }
    }

    fn is_connected(&self) -> bool {
        !matches!(self.mode, Mode::Fail(_))
    }
}
