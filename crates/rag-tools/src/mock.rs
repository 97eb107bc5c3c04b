//! Scriptable tool for tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use rag_types::ToolParams;

use crate::error::ToolError;
use crate::tool::{Tool, ToolOutput};

#[derive(Debug, Clone)]
enum MockBehavior {
    Succeed(Map<String, Value>),
    Unsuccessful(Map<String, Value>),
    Error(String),
}

/// Tool that returns a configured outcome and records every call.
#[derive(Debug, Clone)]
pub struct MockTool {
    name: String,
    behavior: MockBehavior,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<ToolParams>>>,
}

impl MockTool {
    /// A tool that succeeds with an empty payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: MockBehavior::Succeed(Map::new()),
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Succeed with the given JSON object as payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.behavior = MockBehavior::Succeed(into_map(data));
        self
    }

    /// Return an unsuccessful output carrying `data`.
    pub fn with_unsuccessful(mut self, data: Value) -> Self {
        self.behavior = MockBehavior::Unsuccessful(into_map(data));
        self
    }

    /// Fail with a backend error.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.behavior = MockBehavior::Error(message.into());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared handle on recorded call parameters; stays valid after the
    /// tool is moved into a registry.
    pub fn calls(&self) -> Arc<Mutex<Vec<ToolParams>>> {
        self.calls.clone()
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock tool"
    }

    async fn execute(&self, params: &ToolParams) -> Result<ToolOutput, ToolError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(params.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            MockBehavior::Succeed(data) => Ok(ToolOutput::ok(data.clone())),
            MockBehavior::Unsuccessful(data) => Ok(ToolOutput::unsuccessful(data.clone())),
            MockBehavior::Error(message) => Err(ToolError::Backend(message.clone())),
        }
    }
}
