//! OpenAI chat-completions client
//!
//! Function calling is used for tool access. The client is cheap to
//! clone and shares the caller's pooled `reqwest::Client`.

use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::llm::{ChatMessage, ChatModel, ToolSpec};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

pub struct OpenAiClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(client: Client, api_key: SecretString, config: &AdvisorConfig) -> Self {
        Self {
            client,
            api_key,
            base_url: config.openai_base_url.clone(),
            model: config.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatMessage> {
        if self.api_key.expose_secret().is_empty() {
            return Err(AdvisorError::MissingCredential("OpenAI API key"));
        }

        let url = format!("{}/chat/completions", self.base_url);

        let request = CompletionRequest {
            model: &self.model,
            messages,
            tools: tools
                .iter()
                .map(|spec| FunctionTool {
                    kind: "function",
                    function: spec,
                })
                .collect(),
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(
            model = %self.model,
            message_count = messages.len(),
            tool_count = tools.len(),
            "Calling chat completions"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Chat completion request failed: {}", e);
                AdvisorError::LlmError(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, "Chat completion error response: {}", error_text);
            return Err(AdvisorError::LlmError(format!(
                "API returned {}: {}",
                status, error_text
            )));
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse chat completion: {}", e);
            AdvisorError::LlmError(format!("parse error: {}", e))
        })?;

        if let Some(usage) = &completion.usage {
            info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion received"
            );
        }

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AdvisorError::LlmError("no choices in response".to_string()))?;

        debug!(finish_reason = ?choice.finish_reason, "Assistant turn");

        Ok(choice.message)
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionTool<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct FunctionTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSpec,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
