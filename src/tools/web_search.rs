//! Firecrawl-backed web tools: search and single-page scrape

use super::{ensure_object_parameters, require_str, truncate_text, Tool};
use crate::error::AdvisorError;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_LIMIT: u64 = 3;
const MAX_LIMIT: u64 = 5;

pub struct WebSearchTool {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl WebSearchTool {
    pub fn new(client: Client, api_key: SecretString, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<SearchHit>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> &'static str {
        "Search the web for current term-life insurance products, providers and prices"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "limit": { "type": "integer", "minimum": 1, "maximum": MAX_LIMIT },
            },
            "required": ["query"],
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let query = require_str(input, "query")?;
        let limit = input
            .parameters
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);

        let url = format!("{}/v1/search", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({ "query": query, "limit": limit }))
            .send()
            .await
            .map_err(|e| AdvisorError::ToolError(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::ToolError(format!(
                "Search API returned {}: {}",
                status,
                truncate_text(&body)
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::ToolError(format!("Invalid search response: {}", e)))?;

        if !parsed.success {
            return Err(AdvisorError::ToolError(
                parsed
                    .error
                    .unwrap_or_else(|| "search reported failure".to_string()),
            ));
        }

        let results: Vec<Value> = parsed
            .data
            .into_iter()
            .map(|hit| {
                json!({
                    "url": hit.url,
                    "title": hit.title.unwrap_or_default(),
                    "description": truncate_text(&hit.description.unwrap_or_default()),
                })
            })
            .collect();

        Ok(ToolOutput::ok(json!({
            "query": query,
            "results": results,
        })))
    }
}

/// Fetches one page as markdown so the agent can read a product's terms
pub struct ScrapePageTool {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl ScrapePageTool {
    pub fn new(client: Client, api_key: SecretString, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapedPage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapedPage {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    metadata: Option<PageMetadata>,
}

#[derive(Debug, Deserialize)]
struct PageMetadata {
    #[serde(default)]
    title: Option<String>,
}

#[async_trait::async_trait]
impl Tool for ScrapePageTool {
    fn name(&self) -> &'static str {
        "scrape_page"
    }

    fn description(&self) -> &'static str {
        "Fetch a web page (e.g. an insurer's product page) and return its content as markdown"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "Absolute http(s) URL" },
            },
            "required": ["url"],
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let page_url = require_str(input, "url")?;
        if !(page_url.starts_with("http://") || page_url.starts_with("https://")) {
            return Err(AdvisorError::InvalidToolInput(format!(
                "expected an http(s) url, got '{}'",
                page_url
            )));
        }

        let url = format!("{}/v1/scrape", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({ "url": page_url, "formats": ["markdown"] }))
            .send()
            .await
            .map_err(|e| AdvisorError::ToolError(format!("Scrape request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::ToolError(format!(
                "Scrape API returned {}: {}",
                status,
                truncate_text(&body)
            )));
        }

        let parsed: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::ToolError(format!("Invalid scrape response: {}", e)))?;

        if !parsed.success {
            return Err(AdvisorError::ToolError(
                parsed
                    .error
                    .unwrap_or_else(|| "scrape reported failure".to_string()),
            ));
        }

        let page = parsed
            .data
            .ok_or_else(|| AdvisorError::ToolError("scrape returned no page".to_string()))?;
        let title = page.metadata.and_then(|m| m.title).unwrap_or_default();

        Ok(ToolOutput::ok(json!({
            "url": page_url,
            "title": title,
            "markdown": truncate_text(&page.markdown.unwrap_or_default()),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    async fn spawn_mock(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn search_input(parameters: Value) -> ToolInput {
        ToolInput {
            tool_name: "web_search".to_string(),
            parameters,
        }
    }

    #[tokio::test]
    async fn test_search_maps_hits_and_clamps_limit() {
        let router = Router::new().route(
            "/v1/search",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["limit"], 5);
                Json(json!({
                    "success": true,
                    "data": [{
                        "url": "https://example.com/term-life",
                        "title": "Term Life 20",
                        "description": "Level premium term cover"
                    }]
                }))
            }),
        );
        let base_url = spawn_mock(router).await;
        let tool = WebSearchTool::new(Client::new(), SecretString::from("fc".to_string()), base_url);

        let output = tool
            .execute(&search_input(json!({"query": "term life United States", "limit": 50})))
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.data["results"][0]["title"], "Term Life 20");
    }

    #[tokio::test]
    async fn test_reported_failure_is_tool_error() {
        let router = Router::new().route(
            "/v1/search",
            post(|| async { Json(json!({"success": false, "error": "quota exceeded"})) }),
        );
        let base_url = spawn_mock(router).await;
        let tool = WebSearchTool::new(Client::new(), SecretString::from("fc".to_string()), base_url);

        let err = tool
            .execute(&search_input(json!({"query": "term life"})))
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::ToolError(ref msg) if msg.contains("quota")));
    }

    #[tokio::test]
    async fn test_scrape_returns_truncated_markdown() {
        let router = Router::new().route(
            "/v1/scrape",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["url"], "https://insurer.example/term-20");
                assert_eq!(body["formats"], json!(["markdown"]));
                Json(json!({
                    "success": true,
                    "data": {
                        "markdown": "x".repeat(10_000),
                        "metadata": { "title": "Term 20 details" }
                    }
                }))
            }),
        );
        let base_url = spawn_mock(router).await;
        let tool = ScrapePageTool::new(Client::new(), SecretString::from("fc".to_string()), base_url);

        let output = tool
            .execute(&ToolInput {
                tool_name: "scrape_page".to_string(),
                parameters: json!({"url": "https://insurer.example/term-20"}),
            })
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.data["title"], "Term 20 details");
        let markdown = output.data["markdown"].as_str().unwrap();
        assert!(markdown.len() < 10_000);
        assert!(markdown.ends_with('…'));
    }

    #[tokio::test]
    async fn test_scrape_rejects_non_http_url() {
        let tool = ScrapePageTool::new(
            Client::new(),
            SecretString::from("fc".to_string()),
            "http://127.0.0.1:9".to_string(),
        );

        let err = tool
            .execute(&ToolInput {
                tool_name: "scrape_page".to_string(),
                parameters: json!({"url": "file:///etc/passwd"}),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::InvalidToolInput(_)));
    }

    #[tokio::test]
    async fn test_scrape_http_error_is_tool_error() {
        let router = Router::new().route(
            "/v1/scrape",
            post(|| async { (axum::http::StatusCode::PAYMENT_REQUIRED, "out of credits") }),
        );
        let base_url = spawn_mock(router).await;
        let tool = ScrapePageTool::new(Client::new(), SecretString::from("fc".to_string()), base_url);

        let err = tool
            .execute(&ToolInput {
                tool_name: "scrape_page".to_string(),
                parameters: json!({"url": "https://insurer.example"}),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::ToolError(ref msg) if msg.contains("402")));
    }
}
