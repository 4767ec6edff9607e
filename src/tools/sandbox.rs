//! Sandboxed Python execution on E2B
//!
//! Each call creates a fresh sandbox, runs one snippet and kills the
//! sandbox again, whatever the outcome.

use super::{ensure_object_parameters, require_str, truncate_text, Tool};
use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const TEMPLATE_ID: &str = "code-interpreter-v1";
const EXECUTION_PORT: u16 = 49999;

pub struct CodeSandboxTool {
    client: Client,
    api_key: SecretString,
    api_url: String,
    sandbox_domain: String,
    timeout: Duration,
}

impl CodeSandboxTool {
    pub fn new(client: Client, api_key: SecretString, config: &AdvisorConfig) -> Self {
        Self {
            client,
            api_key,
            api_url: config.e2b_api_url.clone(),
            sandbox_domain: config.e2b_sandbox_domain.clone(),
            timeout: config.sandbox_timeout,
        }
    }

    async fn create_sandbox(&self) -> Result<SandboxHandle> {
        let response = self
            .client
            .post(format!("{}/sandboxes", self.api_url))
            .header("X-API-Key", self.api_key.expose_secret())
            .json(&json!({
                "templateID": TEMPLATE_ID,
                "timeout": self.timeout.as_secs(),
            }))
            .send()
            .await
            .map_err(|e| AdvisorError::ToolError(format!("Sandbox create failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::ToolError(format!(
                "Sandbox API returned {}: {}",
                status,
                truncate_text(&body)
            )));
        }

        response
            .json::<SandboxHandle>()
            .await
            .map_err(|e| AdvisorError::ToolError(format!("Invalid sandbox response: {}", e)))
    }

    async fn run_code(&self, sandbox: &SandboxHandle, code: &str) -> Result<ExecutionResult> {
        let url = format!(
            "https://{}-{}.{}/execute",
            EXECUTION_PORT, sandbox.sandbox_id, self.sandbox_domain
        );

        let mut request = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&json!({ "code": code, "language": "python" }));
        if let Some(token) = &sandbox.envd_access_token {
            request = request.header("X-Access-Token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AdvisorError::ToolError(format!("Code execution failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AdvisorError::ToolError(format!("Code execution stream failed: {}", e)))?;

        if !status.is_success() {
            return Err(AdvisorError::ToolError(format!(
                "Code execution returned {}: {}",
                status,
                truncate_text(&body)
            )));
        }

        Ok(parse_execution_stream(&body))
    }

    async fn kill_sandbox(&self, sandbox: &SandboxHandle) {
        let result = self
            .client
            .delete(format!("{}/sandboxes/{}", self.api_url, sandbox.sandbox_id))
            .header("X-API-Key", self.api_key.expose_secret())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(sandbox_id = %sandbox.sandbox_id, "Sandbox killed");
            }
            Ok(response) => {
                warn!(sandbox_id = %sandbox.sandbox_id, status = %response.status(), "Sandbox kill rejected");
            }
            Err(e) => {
                warn!(sandbox_id = %sandbox.sandbox_id, "Sandbox kill failed: {}", e);
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SandboxHandle {
    #[serde(rename = "sandboxID")]
    sandbox_id: String,
    #[serde(default)]
    envd_access_token: Option<String>,
}

/// Collected output of one snippet
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub results: Vec<String>,
    pub error: Option<String>,
}

/// Fold the newline-delimited event stream of the code interpreter.
/// Unknown events and undecodable lines are skipped.
pub fn parse_execution_stream(body: &str) -> ExecutionResult {
    let mut result = ExecutionResult::default();

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Ok(event) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let text = event.get("text").and_then(Value::as_str).unwrap_or_default();

        match event.get("type").and_then(Value::as_str) {
            Some("stdout") => result.stdout.push_str(text),
            Some("stderr") => result.stderr.push_str(text),
            Some("result") if !text.is_empty() => result.results.push(text.to_string()),
            Some("error") => {
                let name = event.get("name").and_then(Value::as_str).unwrap_or("Error");
                let value = event.get("value").and_then(Value::as_str).unwrap_or_default();
                result.error = Some(format!("{}: {}", name, value));
            }
            _ => {}
        }
    }

    result
}

#[async_trait::async_trait]
impl Tool for CodeSandboxTool {
    fn name(&self) -> &'static str {
        "run_python"
    }

    fn description(&self) -> &'static str {
        "Run a Python snippet in an isolated sandbox and return stdout, stderr and results"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": { "type": "string" },
            },
            "required": ["code"],
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let code = require_str(input, "code")?;

        let sandbox = self.create_sandbox().await?;
        debug!(sandbox_id = %sandbox.sandbox_id, "Sandbox created");

        let outcome = self.run_code(&sandbox, code).await;
        self.kill_sandbox(&sandbox).await;

        let execution = outcome?;
        let success = execution.error.is_none();

        Ok(ToolOutput {
            success,
            error: execution.error.clone(),
            data: json!({
                "stdout": truncate_text(&execution.stdout),
                "stderr": truncate_text(&execution.stderr),
                "results": execution.results,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    #[test]
    fn test_parse_execution_stream() {
        let body = r#"
{"type":"stdout","text":"annuity 8.98\n"}
{"type":"result","text":"898258.5","is_main_result":true}
not json at all
{"type":"number_of_executions","execution_count":1}
{"type":"end_of_execution"}
"#;
        let result = parse_execution_stream(body);

        assert_eq!(result.stdout, "annuity 8.98\n");
        assert_eq!(result.results, vec!["898258.5".to_string()]);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_parse_execution_error() {
        let body = r#"{"type":"error","name":"ZeroDivisionError","value":"division by zero","traceback":"..."}"#;
        let result = parse_execution_stream(body);

        assert_eq!(result.error.as_deref(), Some("ZeroDivisionError: division by zero"));
    }

    #[tokio::test]
    async fn test_create_failure_is_tool_error() {
        let router = Router::new().route(
            "/sandboxes",
            post(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"message": "invalid key"}))) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let config = AdvisorConfig {
            e2b_api_url: format!("http://{}", addr),
            ..AdvisorConfig::default()
        };
        let tool = CodeSandboxTool::new(Client::new(), SecretString::from("bad".to_string()), &config);

        let err = tool
            .execute(&ToolInput {
                tool_name: "run_python".to_string(),
                parameters: json!({"code": "print(1)"}),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::ToolError(ref msg) if msg.contains("401")));
    }
}
