// SPDX-License-Identifier: MIT

use crate::adk::error::PauseGraphError;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error;

const TAVILY_URL: &str = "https://api.tavily.com/search";

/// Name the search tool registers under
pub const TAVILY_TOOL_NAME: &str = "tavily_search";

static TAVILY_SEARCH_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The search query"
            }
        },
        "required": ["query"]
    })
});

#[derive(Debug, Serialize, Deserialize)]
pub struct TavilySearchArgs {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// Web search through the Tavily API
pub struct TavilySearchTool {
    client: Client,
    api_key: String,
    max_results: u32,
    endpoint: String,
}

impl TavilySearchTool {
    pub fn new(api_key: impl Into<String>, max_results: u32) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            max_results,
            endpoint: TAVILY_URL.to_string(),
        }
    }

    /// Reads `TAVILY_API_KEY`
    pub fn from_env(max_results: u32) -> Result<Self, PauseGraphError> {
        let api_key = std::env::var("TAVILY_API_KEY")
            .map_err(|_| PauseGraphError::config("TAVILY_API_KEY must be set"))?;
        Ok(Self::new(api_key, max_results))
    }

    /// Point at a different endpoint (self-hosted proxy, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request_body(&self, query: &str) -> Value {
        json!({
            "query": query,
            "max_results": self.max_results,
            "search_depth": "basic"
        })
    }
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &str {
        TAVILY_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Searches the web for current information. Returns the most relevant pages with title, URL and an excerpt."
    }

    fn schema(&self) -> &Value {
        &TAVILY_SEARCH_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
        let args: TavilySearchArgs = serde_json::from_value(input)?;

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&args.query))
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(format!("Tavily API error: {}", text).into());
        }

        let body: TavilyResponse = resp.json().await?;
        log::debug!(
            "Tavily returned {} results for '{}'",
            body.results.len(),
            args.query
        );

        Ok(json!({
            "query": args.query,
            "results": body.results
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_carries_max_results() {
        let tool = TavilySearchTool::new("tvly-test", 2);
        let body = tool.request_body("current president of India");
        assert_eq!(body["query"], "current president of India");
        assert_eq!(body["max_results"], 2);
    }

    #[test]
    fn test_schema_requires_query() {
        let tool = TavilySearchTool::new("k", 2);
        assert_eq!(tool.name(), "tavily_search");
        assert_eq!(tool.schema()["required"][0], "query");
    }

    #[test]
    fn test_response_parsing() {
        let body: TavilyResponse = serde_json::from_value(json!({
            "query": "q",
            "results": [{
                "title": "President of India",
                "url": "https://example.org",
                "content": "Droupadi Murmu ...",
                "score": 0.98
            }]
        }))
        .unwrap();
        assert_eq!(body.results.len(), 1);
        assert_eq!(body.results[0].score, Some(0.98));
    }

    #[tokio::test]
    async fn test_bad_arguments_fail_before_request() {
        let tool = TavilySearchTool::new("k", 2).with_endpoint("http://127.0.0.1:9");
        assert!(tool.execute(json!({"q": 1})).await.is_err());
    }
}
