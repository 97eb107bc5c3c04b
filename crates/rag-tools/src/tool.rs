//! Tool capability interface.

use async_trait::async_trait;
use serde_json::{Map, Value};

use rag_types::ToolParams;

use crate::error::ToolError;

/// What a tool hands back to the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub success: bool,
    pub data: Map<String, Value>,
}

impl ToolOutput {
    pub fn ok(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            data,
        }
    }

    /// Tool ran but could not produce a usable answer.
    pub fn unsuccessful(data: Map<String, Value>) -> Self {
        Self {
            success: false,
            data,
        }
    }
}

/// A named capability the pipeline can invoke.
///
/// Implementations must be thread-safe (Send + Sync); the registry shares
/// them behind `Arc` and may call them concurrently.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the tool is registered under.
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str;

    /// Run the tool.
    async fn execute(&self, params: &ToolParams) -> Result<ToolOutput, ToolError>;
}

/// Required, non-blank string parameter.
pub fn required_str<'a>(params: &'a ToolParams, key: &str) -> Result<&'a str, ToolError> {
    match params.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) => Err(ToolError::InvalidParams(format!(
            "'{}' must not be empty",
            key
        ))),
        Some(_) => Err(ToolError::InvalidParams(format!(
            "'{}' must be a string",
            key
        ))),
        None => Err(ToolError::InvalidParams(format!("missing '{}'", key))),
    }
}

/// Optional positive integer parameter.
pub fn optional_usize(params: &ToolParams, key: &str) -> Result<Option<usize>, ToolError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .filter(|n| *n > 0)
            .map(|n| Some(n as usize))
            .ok_or_else(|| {
                ToolError::InvalidParams(format!("'{}' must be a positive integer", key))
            }),
    }
}
