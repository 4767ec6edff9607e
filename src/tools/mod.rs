//! Tool trait and registry
//!
//! Tools are what the recommendation agent may call between model turns.
//! HTTP-backed tools receive their credentials at construction.

use crate::config::{duplicate, AdvisorConfig, Credentials};
use crate::llm::ToolSpec;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub mod coverage;
pub mod sandbox;
pub mod web_search;

pub use coverage::CoverageTool;
pub use sandbox::CodeSandboxTool;
pub use web_search::{ScrapePageTool, WebSearchTool};

/// Longest string handed back to the model from a single tool result
const MAX_TOOL_TEXT: usize = 4_000;

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the tool's arguments
    fn parameters(&self) -> Value;
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Specs advertised to the model, in stable name order
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.list()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Run a tool by name. Failures become a failed `ToolOutput` so the
    /// model can see them and carry on.
    pub async fn execute(&self, input: &ToolInput) -> ToolOutput {
        let Some(tool) = self.get(&input.tool_name) else {
            warn!(tool_name = %input.tool_name, "Model requested unknown tool");
            return ToolOutput::failed(format!("Tool not found: {}", input.tool_name));
        };

        let started = Instant::now();
        let output = match tool.execute(input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool_name = %input.tool_name, "Tool failed: {}", e);
                ToolOutput::failed(e.to_string())
            }
        };

        debug!(
            tool_name = %input.tool_name,
            success = output.success,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tool finished"
        );

        output
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn ensure_object_parameters(input: &ToolInput) -> Result<()> {
    if input.parameters.is_object() {
        Ok(())
    } else {
        Err(crate::error::AdvisorError::InvalidToolInput(
            "tool arguments must be a JSON object".to_string(),
        ))
    }
}

pub(crate) fn require_str<'a>(input: &'a ToolInput, key: &str) -> Result<&'a str> {
    input
        .parameters
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            crate::error::AdvisorError::InvalidToolInput(format!("expected '{}' string", key))
        })
}

pub(crate) fn truncate_text(text: &str) -> String {
    if text.len() <= MAX_TOOL_TEXT {
        return text.to_string();
    }
    let mut end = MAX_TOOL_TEXT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}

/// Registry with web search and scrape, sandboxed Python and the local calculator.
pub fn create_default_registry(
    client: Client,
    credentials: &Credentials,
    config: &AdvisorConfig,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(WebSearchTool::new(
        client.clone(),
        duplicate(&credentials.firecrawl_api_key),
        config.firecrawl_base_url.clone(),
    )));
    registry.register(Arc::new(ScrapePageTool::new(
        client.clone(),
        duplicate(&credentials.firecrawl_api_key),
        config.firecrawl_base_url.clone(),
    )));
    registry.register(Arc::new(CodeSandboxTool::new(
        client,
        duplicate(&credentials.e2b_api_key),
        config,
    )));
    registry.register(Arc::new(CoverageTool::new(config.discount_rate)));

    registry
}
