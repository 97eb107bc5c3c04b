//! Tool registry: uniform, never-failing invocation over named tools.
//!
//! Every call is timed and bounded by a per-invocation deadline. Unknown
//! names, tool errors and timeouts all come back as a failed
//! [`ToolResult`]; nothing propagates to the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use rag_types::{ToolParams, ToolResult, ToolsConfig};

use crate::calculator::CalculatorTool;
use crate::corpus::Corpus;
use crate::error::ToolError;
use crate::tool::Tool;
use crate::vector::VectorSearchTool;
use crate::web::{WebSearchProvider, WebSearchTool};

/// Name-indexed collection of tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    timeout: Duration,
    invocations: AtomicU64,
}

impl ToolRegistry {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create an empty registry.
    pub fn new() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            tools: HashMap::new(),
            timeout,
            invocations: AtomicU64::new(0),
        }
    }

    /// Empty registry with the configured deadline.
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::with_timeout(Duration::from_millis(config.timeout_ms))
    }

    /// Registry with vector_search, calculator and (when a provider is
    /// given) web_search.
    pub fn with_defaults(
        corpus: Arc<Corpus>,
        web: Option<Box<dyn WebSearchProvider>>,
        config: &ToolsConfig,
        default_top_k: usize,
    ) -> Self {
        let mut registry = Self::from_config(config);
        registry.register(VectorSearchTool::new(corpus).with_default_top_k(default_top_k));
        registry.register(CalculatorTool::new());
        if let Some(provider) = web {
            registry.register(
                WebSearchTool::new(provider).with_max_results(config.web_search.max_results),
            );
        }
        registry
    }

    /// Register a tool under its own name, replacing any previous one.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "Replaced existing tool registration");
        } else {
            debug!(tool = %name, "Registered tool");
        }
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Total `execute` calls, including ones for unknown tools.
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invoke a tool by name.
    pub async fn execute(&self, name: &str, params: &ToolParams) -> ToolResult {
        self.invocations.fetch_add(1, Ordering::Relaxed);

        let Some(tool) = self.tools.get(name) else {
            warn!(tool = name, "Unknown tool requested");
            return ToolResult::failure(name, format!("Unknown tool: {}", name), 0.0);
        };

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, tool.execute(params)).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(output)) if output.success => {
                debug!(tool = name, elapsed_ms, "Tool completed");
                ToolResult::success(name, output.data, elapsed_ms)
            }
            Ok(Ok(output)) => {
                debug!(tool = name, elapsed_ms, "Tool reported no usable result");
                ToolResult {
                    data: output.data,
                    ..ToolResult::failure(name, "Tool reported failure", elapsed_ms)
                }
            }
            Ok(Err(e)) => {
                warn!(tool = name, error = %e, "Tool failed");
                ToolResult::failure(name, e.to_string(), elapsed_ms)
            }
            Err(_) => {
                let e = ToolError::Timeout(self.timeout.as_millis() as u64);
                warn!(tool = name, error = %e, "Tool timed out");
                ToolResult::failure(name, e.to_string(), elapsed_ms)
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;
    use crate::mock::MockTool;
    use crate::web::{StaticWebSearch, WebHit};
    use serde_json::json;

    fn params(v: serde_json::Value) -> ToolParams {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_unknown_tool_is_failure() {
        let registry = ToolRegistry::new();
        let result = registry.execute("nope", &ToolParams::new()).await;

        assert!(!result.success);
        assert!(result.data.is_empty());
        assert_eq!(result.tool_name, "nope");
        assert!(result.error.unwrap().contains("Unknown tool"));
        assert_eq!(registry.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_tool_error_is_wrapped() {
        let mut registry = ToolRegistry::new();
        registry.register(MockTool::new("flaky").with_error("backend down"));

        let result = registry.execute("flaky", &ToolParams::new()).await;
        assert!(!result.success);
        assert!(result.data.is_empty());
        assert_eq!(result.error.as_deref(), Some("Backend error: backend down"));
    }

    #[tokio::test]
    async fn test_unsuccessful_output_keeps_data() {
        let mut registry = ToolRegistry::new();
        registry.register(MockTool::new("partial").with_unsuccessful(json!({"reason": "empty"})));

        let result = registry.execute("partial", &ToolParams::new()).await;
        assert!(!result.success);
        assert_eq!(result.data["reason"], "empty");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_failure() {
        let mut registry = ToolRegistry::with_timeout(Duration::from_millis(50));
        registry.register(MockTool::new("slow").with_delay(Duration::from_secs(5)));

        let result = registry.execute("slow", &ToolParams::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Timed out after 50ms"));
        assert!(result.execution_time_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_success_passes_data_through() {
        let mut registry = ToolRegistry::new();
        let tool = MockTool::new("echo").with_data(json!({"results": [{"content": "hi"}]}));
        let calls = tool.calls();
        registry.register(tool);

        let result = registry.execute("echo", &params(json!({"query": "x"}))).await;
        assert!(result.success);
        assert_eq!(result.result_items().len(), 1);
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(calls.lock().unwrap()[0]["query"], "x");
    }

    #[tokio::test]
    async fn test_with_defaults() {
        let corpus = Arc::new(
            Corpus::from_documents(vec![Document::new(
                "ml",
                "Machine learning is a field of artificial intelligence.",
            )])
            .unwrap(),
        );
        let web = StaticWebSearch::new(vec![WebHit::new("t", "s", "https://x.example")]);
        let registry =
            ToolRegistry::with_defaults(corpus.clone(), Some(Box::new(web)), &ToolsConfig::default(), 5);
        assert_eq!(
            registry.tool_names(),
            vec!["calculator", "vector_search", "web_search"]
        );

        let result = registry
            .execute("calculator", &params(json!({"expression": "6 * 7"})))
            .await;
        assert!(result.success);
        assert_eq!(result.data["result"], 42.0);

        let without_web = ToolRegistry::with_defaults(corpus, None, &ToolsConfig::default(), 5);
        assert!(!without_web.has_tool("web_search"));
    }
}
