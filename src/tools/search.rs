use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ToolError;
use crate::tools::Tool;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub max_results: usize,
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.tavily.com/search".to_string(),
            max_results: 1,
            timeout_ms: 15_000,
        }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default, alias = "snippet")]
    pub content: String,
}

/// Top-K web search against a Tavily-compatible endpoint.
pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: String,
    config: SearchConfig,
}

impl WebSearchTool {
    pub fn new(api_key: String, config: SearchConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ToolError::NetworkFailure(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ToolError> {
        let body = SearchRequest {
            api_key: &self.api_key,
            query,
            max_results: self.config.max_results,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::NetworkFailure(format!(
                "search endpoint returned {status}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::ParseFailure(format!("unexpected search response: {e}")))?;

        let mut results = parsed.results;
        results.truncate(self.config.max_results);
        debug!(query, results = results.len(), "Search completed");
        Ok(results)
    }
}

/// Numbered title/url/snippet blocks the model can read
pub fn render_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for '{query}'.");
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   {}\n   {}", i + 1, r.title, r.url, r.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Takes a query and returns the top results with title, URL and snippet."
    }

    fn input_name(&self) -> &str {
        "query"
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("search query is empty".to_string()));
        }
        let results = self.search(query).await?;
        Ok(render_results(query, &results))
    }
}
