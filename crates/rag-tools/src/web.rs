//! web_search tool and its search backends.
//!
//! The tool itself only validates parameters and shapes the result; the
//! actual search is delegated to a [`WebSearchProvider`]. [`HttpWebSearch`]
//! talks to a JSON search endpoint, [`StaticWebSearch`] serves canned hits.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

use rag_types::{ToolParams, WebSearchConfig, WEB_SEARCH};

use crate::error::ToolError;
use crate::tool::{optional_usize, required_str, Tool, ToolOutput};

/// A single web search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebHit {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    pub url: String,
}

impl WebHit {
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: url.into(),
        }
    }
}

/// Backend that answers web queries.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebHit>, ToolError>;
}

/// Configuration for [`HttpWebSearch`].
#[derive(Debug, Clone)]
pub struct HttpWebSearchConfig {
    /// Search endpoint; queried as `GET {endpoint}?q=..&count=..`
    pub endpoint: String,

    /// Sent as a bearer token when present
    pub api_key: Option<SecretString>,

    pub timeout: Duration,

    /// Total attempts, including the first
    pub max_retries: u32,

    /// First retry delay; doubles per attempt
    pub initial_backoff: Duration,
}

impl HttpWebSearchConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: Duration::from_secs(8),
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }

    /// Build from settings. `None` when no endpoint is configured.
    pub fn from_settings(config: &WebSearchConfig) -> Option<Self> {
        let endpoint = config.endpoint.as_ref()?.trim();
        if endpoint.is_empty() {
            return None;
        }
        Some(Self {
            endpoint: endpoint.to_string(),
            api_key: config
                .api_key
                .as_ref()
                .map(|k| SecretString::from(k.clone())),
            timeout: Duration::from_millis(config.request_timeout_ms),
            max_retries: config.max_retries.max(1),
            initial_backoff: Duration::from_millis(200),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<WebHit>,
}

/// JSON-over-HTTP search backend with retry.
pub struct HttpWebSearch {
    client: Client,
    config: HttpWebSearchConfig,
}

impl HttpWebSearch {
    pub fn new(config: HttpWebSearchConfig) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ToolError::Backend(e.to_string()))?;

        Ok(Self { client, config })
    }

    async fn make_request(&self, query: &str, max_results: usize) -> Result<Vec<WebHit>, ToolError> {
        let mut request = self
            .client
            .get(&self.config.endpoint)
            .query(&[("q", query), ("count", &max_results.to_string())]);

        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::Backend(e.to_string()))?;

        if response.status() == 429 {
            return Err(ToolError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status.is_client_error() {
                return Err(ToolError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }
            return Err(ToolError::Backend(format!("HTTP {}: {}", status, body)));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Backend(format!("invalid search response: {}", e)))?;

        Ok(body.results.into_iter().take(max_results).collect())
    }
}

#[async_trait]
impl WebSearchProvider for HttpWebSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebHit>, ToolError> {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.config.initial_backoff,
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, query = query, "Calling web search endpoint");

            match self.make_request(query, max_results).await {
                Ok(hits) => return Ok(hits),
                Err(e) => {
                    if !e.is_retryable() {
                        error!(error = %e, attempts, "Web search request rejected");
                        return Err(e);
                    }
                    if attempts >= self.config.max_retries {
                        error!(error = %e, attempts, "Web search retries exhausted");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "Web search failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }
}

/// Fixed hit list; returns the same hits for every query.
#[derive(Debug, Clone, Default)]
pub struct StaticWebSearch {
    hits: Vec<WebHit>,
}

impl StaticWebSearch {
    pub fn new(hits: Vec<WebHit>) -> Self {
        Self { hits }
    }

    /// A provider that never finds anything.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebSearchProvider for StaticWebSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<WebHit>, ToolError> {
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}

/// Web search exposed as a tool.
///
/// Params: `query` (required), `max_results` (optional).
pub struct WebSearchTool {
    provider: Box<dyn WebSearchProvider>,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(provider: Box<dyn WebSearchProvider>) -> Self {
        Self {
            provider,
            max_results: 5,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        WEB_SEARCH
    }

    fn description(&self) -> &str {
        "Search the web for current information"
    }

    async fn execute(&self, params: &ToolParams) -> Result<ToolOutput, ToolError> {
        let query = required_str(params, "query")?;
        let max_results = optional_usize(params, "max_results")?.unwrap_or(self.max_results);

        let hits = self.provider.search(query, max_results).await?;
        let results: Vec<Value> = hits
            .into_iter()
            .map(|hit| json!({"title": hit.title, "snippet": hit.snippet, "url": hit.url}))
            .collect();

        let mut data = Map::new();
        data.insert("query".to_string(), json!(query));
        data.insert("results".to_string(), Value::Array(results));
        Ok(ToolOutput::ok(data))
    }
}
