//! Normalized tool result envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Semantic retrieval over the injected corpus.
pub const VECTOR_SEARCH: &str = "vector_search";
/// Live web search.
pub const WEB_SEARCH: &str = "web_search";
/// Arithmetic expression evaluation.
pub const CALCULATOR: &str = "calculator";

/// Tool parameters and payloads are plain JSON objects.
pub type ToolParams = Map<String, Value>;

/// Result of a single tool invocation.
///
/// Produced once by the registry and never mutated afterwards. Failed
/// invocations carry an empty `data` map and an error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name the tool was invoked under
    pub tool_name: String,

    /// Whether the tool reported success
    pub success: bool,

    /// Tool payload (empty on failure)
    pub data: Map<String, Value>,

    /// Wall-clock time spent in the tool
    pub execution_time_ms: f64,

    /// Failure description, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result.
    pub fn success(tool_name: impl Into<String>, data: Map<String, Value>, elapsed_ms: f64) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            data,
            execution_time_ms: elapsed_ms.max(0.0),
            error: None,
        }
    }

    /// Create a failed result.
    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            data: Map::new(),
            execution_time_ms: elapsed_ms.max(0.0),
            error: Some(error.into()),
        }
    }

    /// Items under the `results` key, if the payload has one.
    pub fn result_items(&self) -> &[Value] {
        self.data
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True for retrieval-style tools (vector or web search).
    pub fn is_retrieval(&self) -> bool {
        self.tool_name == VECTOR_SEARCH || self.tool_name == WEB_SEARCH
    }

    /// Successful retrieval that returned nothing.
    pub fn is_empty_retrieval(&self) -> bool {
        self.success && self.is_retrieval() && self.result_items().is_empty()
    }
}
