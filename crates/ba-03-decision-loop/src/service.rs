//! Two-phase decide/act loop.
//!
//! ```text
//!        ┌──────────┐  actions proposed   ┌─────────┐
//! start ─▶  Decide  ├────────────────────▶│   Act   │
//!        └────┬─────┘◀────────────────────┴─────────┘
//!             │ no action                   always
//!             ▼
//!          return
//! ```
//!
//! Termination is a return from `run`, never a third phase.

use crate::domain::{
    ActionOutcome, ActionState, Decision, LoopConfig, LoopError, ProposedAction,
};
use crate::ports::{ActionDispatcher, DecisionFunction};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The decision function proposed no further action.
    Completed,
    /// The act-phase cap was reached while actions were still proposed.
    IterationLimit,
}

/// Final result of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopOutcome {
    pub termination: Termination,
    pub state: ActionState,
    /// Number of act phases executed.
    pub iterations: u32,
}

#[derive(Debug)]
enum Phase {
    Decide,
    Act(Vec<ProposedAction>),
}

/// Transition out of `Decide`.
fn after_decide(decision: Decision) -> Option<Phase> {
    if decision.is_final() {
        None
    } else {
        Some(Phase::Act(decision.actions))
    }
}

/// Drives a decision function against a dispatcher.
pub struct DecisionLoop {
    dispatcher: Arc<dyn ActionDispatcher>,
    decision: Arc<dyn DecisionFunction>,
    config: LoopConfig,
}

impl DecisionLoop {
    pub fn new(
        dispatcher: Arc<dyn ActionDispatcher>,
        decision: Arc<dyn DecisionFunction>,
        config: LoopConfig,
    ) -> Self {
        Self {
            dispatcher,
            decision,
            config,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.dispatcher.is_connected()
    }

    /// Run the loop for `instruction` until the decision function stops
    /// proposing actions or the iteration cap is reached.
    ///
    /// Only a decision-function failure is fatal; dispatch failures are
    /// recorded in the state and the loop carries on.
    pub async fn run(&self, instruction: impl Into<String>) -> Result<LoopOutcome, LoopError> {
        let instruction = instruction.into();
        if instruction.trim().is_empty() {
            return Err(LoopError::EmptyInstruction);
        }

        let mut state = ActionState::new(instruction);
        let mut iterations: u32 = 0;
        let mut phase = Phase::Decide;

        info!(max_iterations = self.config.max_iterations, "Decision loop started");

        loop {
            phase = match phase {
                Phase::Decide => {
                    let mut decision = self.decision.decide(&state).await.map_err(|e| {
                        warn!(error = %e, records = state.records.len(), "Decision function failed");
                        LoopError::Decision(e)
                    })?;
                    if let Some(note) = decision.note.take() {
                        state.add_note(iterations + 1, note);
                    }
                    debug!(proposed = decision.actions.len(), "Decision made");

                    match after_decide(decision) {
                        None => return Ok(self.finish(state, iterations, Termination::Completed)),
                        Some(_) if iterations >= self.config.max_iterations => {
                            warn!(iterations, "Iteration limit reached, stopping");
                            return Ok(self.finish(state, iterations, Termination::IterationLimit));
                        }
                        Some(next) => next,
                    }
                }
                Phase::Act(actions) => {
                    iterations += 1;
                    for proposed in actions {
                        let outcome = self.dispatch(&proposed).await;
                        state.record(iterations, proposed, outcome);
                    }
                    Phase::Decide
                }
            };
        }
    }

    async fn dispatch(&self, proposed: &ProposedAction) -> ActionOutcome {
        let command = proposed.to_command();
        debug!(call_id = %proposed.call_id, action = %proposed.action, "Dispatching action");

        match self
            .dispatcher
            .send_and_wait(&command, self.config.action_timeout)
            .await
        {
            Ok(reply) => {
                debug!(call_id = %proposed.call_id, status = %reply.status, "Action answered");
                ActionOutcome::Completed {
                    status: reply.status,
                    payload: reply.payload,
                }
            }
            Err(e) => {
                warn!(
                    call_id = %proposed.call_id,
                    action = %proposed.action,
                    error = %e,
                    "Action dispatch failed"
                );
                ActionOutcome::Failed {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                }
            }
        }
    }

    fn finish(&self, state: ActionState, iterations: u32, termination: Termination) -> LoopOutcome {
        info!(
            termination = ?termination,
            iterations,
            records = state.records.len(),
            "Decision loop finished"
        );
        LoopOutcome {
            termination,
            state,
            iterations,
        }
    }
}
