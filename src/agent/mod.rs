//! Recommendation agent - model/tool loop
//!
//! PROFILE → MODEL → (TOOL CALLS → MODEL)* → FINAL JSON

use crate::error::AdvisorError;
use crate::llm::{ChatMessage, ChatModel};
use crate::models::{AgentRequest, ToolInput};
use crate::tools::ToolRegistry;
use crate::Result;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const AGENT_NAME: &str = "Life Insurance Agent";

const INSTRUCTIONS: &[&str] = &[
    "Calculate life insurance coverage using income replacement logic.",
    "Use the calculate_coverage tool for the coverage figure and explain how it was derived.",
    "Explain assumptions clearly.",
    "Recommend up to 3 term-life products relevant to the user location.",
    "Find products with web_search and open a product page with scrape_page before citing its terms.",
    "Return ONLY valid JSON.",
];

const RESPONSE_SHAPE: &str = r#"{
  "coverage_amount": <number>,
  "breakdown": { ... how the figure was calculated ... },
  "assumptions": ["..."],
  "products": [
    { "name": "...", "provider": "...", "url": "...", "notes": "..." }
  ]
}"#;

fn system_prompt() -> String {
    format!(
        "You are the {}.\n\n- {}\n\nRespond with a single JSON object of this shape:\n{}",
        AGENT_NAME,
        INSTRUCTIONS.join("\n- "),
        RESPONSE_SHAPE
    )
}

/// Final answer of one agent run
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub content: String,
    pub tool_calls: Vec<String>,
    pub rounds: u32,
}

pub struct InsuranceAgent {
    model: Box<dyn ChatModel>,
    tools: ToolRegistry,
    max_tool_rounds: u32,
}

impl InsuranceAgent {
    pub fn new(model: Box<dyn ChatModel>, tools: ToolRegistry, max_tool_rounds: u32) -> Self {
        Self {
            model,
            tools,
            max_tool_rounds,
        }
    }

    /// Run the agent on one serialized profile.
    pub async fn run(&self, request: &AgentRequest) -> Result<AgentOutcome> {
        let payload = serde_json::to_string(request)?;
        let specs = self.tools.specs();

        let mut messages = vec![ChatMessage::system(system_prompt()), ChatMessage::user(payload)];
        let mut tool_calls = Vec::new();

        for round in 0..=self.max_tool_rounds {
            let reply = self.model.complete(&messages, &specs).await?;

            if reply.tool_calls.is_empty() {
                let content = reply
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| AdvisorError::LlmError("empty final answer".to_string()))?;

                info!(rounds = round, tool_calls = tool_calls.len(), "Agent finished");

                return Ok(AgentOutcome {
                    content,
                    tool_calls,
                    rounds: round,
                });
            }

            if round == self.max_tool_rounds {
                break;
            }

            debug!(round, requested = reply.tool_calls.len(), "Agent requested tools");

            let calls = reply.tool_calls.clone();
            messages.push(reply);

            for call in calls {
                let parameters = parse_arguments(&call.function.arguments);
                let input = ToolInput {
                    tool_name: call.function.name.clone(),
                    parameters,
                };

                let output = self.tools.execute(&input).await;
                if !output.success {
                    warn!(tool_name = %call.function.name, "Tool call reported failure");
                }
                tool_calls.push(call.function.name);

                let body = if output.success {
                    output.data
                } else {
                    json!({ "error": output.error.unwrap_or_else(|| "tool failed".to_string()) })
                };
                messages.push(ChatMessage::tool_result(call.id, body.to_string()));
            }
        }

        Err(AdvisorError::ToolLoopExceeded(self.max_tool_rounds))
    }
}

// Arguments the model failed to encode still reach the tool, which
// rejects them with a readable error.
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
