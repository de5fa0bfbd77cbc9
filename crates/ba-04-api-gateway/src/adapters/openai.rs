//! Decision function backed by an OpenAI-compatible chat completions API.
//!
//! The accumulated state is replayed as a conversation: the instruction as
//! the user turn, then one assistant tool call and one tool result per
//! executed action. A reply with tool calls proposes actions; a reply with
//! none ends the loop and its text becomes the final note.

use crate::domain::OpenAiConfig;
use async_trait::async_trait;
use ba_03_decision_loop::{
    ActionOutcome, ActionRecord, ActionState, Decision, DecisionError, DecisionFunction,
    ProposedAction,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_types::{Arguments, Status};
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You operate a web browser on behalf of the user. \
Use the available tools to carry out the instruction, one step at a time. \
When the instruction is fulfilled or cannot be completed, answer without calling a tool.";

/// Browser tools offered to the model, as (tool name, worker action).
const TOOLS: [(&str, &str); 2] = [("goto_url", "goto"), ("screenshot", "screenshot")];

fn tool_definitions() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": "goto_url",
                "description": "Navigates the browser to a specified URL.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "url": {"type": "string", "description": "The URL to navigate to."}
                    },
                    "required": ["url"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "screenshot",
                "description": "Captures the current page to a file.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "path": {"type": "string", "description": "Where to save the capture."}
                    }
                }
            }
        }
    ])
}

fn action_for_tool(tool: &str) -> &str {
    TOOLS
        .iter()
        .find(|(name, _)| *name == tool)
        .map(|(_, action)| *action)
        .unwrap_or(tool)
}

fn tool_for_action(action: &str) -> &str {
    TOOLS
        .iter()
        .find(|(_, a)| *a == action)
        .map(|(name, _)| *name)
        .unwrap_or(action)
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<Value>,
    tools: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    id: String,
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

// =============================================================================
// Conversation rendering
// =============================================================================

/// Text handed back to the model for one executed action.
fn tool_output(record: &ActionRecord) -> String {
    let url = record
        .arguments
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match (&record.outcome, record.action.as_str()) {
        (ActionOutcome::Completed { status, payload }, "goto") => {
            let details = payload_text(payload);
            if *status == Status::Success {
                format!("Successfully navigated to {url}. Details: {details}")
            } else {
                format!("Failed to navigate to {url}. Reason: {details}")
            }
        }
        (ActionOutcome::Failed { kind, .. }, _) if kind == "not_connected" => {
            "Error: Agent is not connected.".to_string()
        }
        (ActionOutcome::Failed { kind, .. }, _) if kind == "timeout" => {
            "Error: Timed out waiting for a response from the browser agent.".to_string()
        }
        (outcome, _) => outcome.summary(),
    }
}

fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One assistant turn per act phase, carrying the text the model sent with
/// its tool calls, followed by one tool message per call.
fn render_messages(state: &ActionState) -> Vec<Value> {
    let mut messages = Vec::with_capacity(2 + state.records.len() * 2);
    messages.push(json!({"role": "system", "content": SYSTEM_PROMPT}));
    messages.push(json!({"role": "user", "content": state.instruction}));

    for (turn, records) in state.turns() {
        let tool_calls: Vec<Value> = records
            .iter()
            .map(|record| {
                json!({
                    "id": record.call_id,
                    "type": "function",
                    "function": {
                        "name": tool_for_action(&record.action),
                        "arguments": Value::Object(record.arguments.clone()).to_string(),
                    }
                })
            })
            .collect();
        messages.push(json!({
            "role": "assistant",
            "content": state.note_for(turn),
            "tool_calls": tool_calls,
        }));
        for record in records {
            messages.push(json!({
                "role": "tool",
                "tool_call_id": record.call_id,
                "content": tool_output(record),
            }));
        }
    }
    messages
}

fn parse_decision(response: ChatResponse) -> Result<Decision, DecisionError> {
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(DecisionError::InvalidResponse("no choices in response".into()));
    };
    let message = choice.message;
    let tool_calls = message.tool_calls.unwrap_or_default();

    let mut actions = Vec::with_capacity(tool_calls.len());
    for call in tool_calls {
        let arguments: Arguments = if call.function.arguments.trim().is_empty() {
            Arguments::new()
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|e| {
                DecisionError::InvalidResponse(format!(
                    "tool call {} has invalid arguments: {e}",
                    call.function.name
                ))
            })?
        };
        let mut proposed = ProposedAction::new(call.id, action_for_tool(&call.function.name));
        proposed.arguments = arguments;
        actions.push(proposed);
    }

    let note = message.content.filter(|c| !c.trim().is_empty());
    Ok(Decision { actions, note })
}

// =============================================================================
// Decision function
// =============================================================================

/// Chat-completions decision function.
pub struct OpenAiDecisionFunction {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiDecisionFunction {
    pub fn new(config: OpenAiConfig) -> Result<Self, DecisionError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DecisionError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl DecisionFunction for OpenAiDecisionFunction {
    async fn decide(&self, state: &ActionState) -> Result<Decision, DecisionError> {
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: render_messages(state),
            tools: tool_definitions(),
        };
        debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            "Requesting decision"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DecisionError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Decision service returned an error");
            return Err(DecisionError::Unavailable(format!("{status}: {body}")));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| DecisionError::InvalidResponse(e.to_string()))?;
        let decision = parse_decision(body)?;
        debug!(actions = decision.actions.len(), "Decision received");
        Ok(decision)
    }
}
