//! vector_search tool: semantic retrieval over the injected corpus.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use rag_types::{ToolParams, VECTOR_SEARCH};

use crate::corpus::Corpus;
use crate::error::ToolError;
use crate::tool::{optional_usize, required_str, Tool, ToolOutput};

/// Semantic search over a [`Corpus`].
///
/// Params: `query` (required), `top_k` (optional).
pub struct VectorSearchTool {
    corpus: Arc<Corpus>,
    default_top_k: usize,
    min_score: f32,
}

impl VectorSearchTool {
    pub const DEFAULT_MIN_SCORE: f32 = 0.05;

    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self {
            corpus,
            default_top_k: 5,
            min_score: Self::DEFAULT_MIN_SCORE,
        }
    }

    /// Set the top_k used when the caller passes none.
    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k.max(1);
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }
}

#[async_trait]
impl Tool for VectorSearchTool {
    fn name(&self) -> &str {
        VECTOR_SEARCH
    }

    fn description(&self) -> &str {
        "Semantic retrieval over the document corpus"
    }

    async fn execute(&self, params: &ToolParams) -> Result<ToolOutput, ToolError> {
        let query = required_str(params, "query")?;
        let top_k = optional_usize(params, "top_k")?.unwrap_or(self.default_top_k);

        let hits = self
            .corpus
            .search(query, top_k, self.min_score)
            .map_err(|e| ToolError::Backend(e.to_string()))?;

        debug!(query = query, hits = hits.len(), "vector_search completed");

        let results: Vec<Value> = hits
            .into_iter()
            .map(|hit| {
                json!({
                    "content": hit.chunk.content,
                    "score": hit.score,
                    "document_id": hit.chunk.document_id,
                    "chunk_id": hit.chunk.chunk_id,
                    "start_offset": hit.chunk.start_offset,
                    "end_offset": hit.chunk.end_offset,
                    "page_number": hit.chunk.page_number,
                    "source": hit.chunk.source,
                })
            })
            .collect();

        let mut data = Map::new();
        data.insert("query".to_string(), json!(query));
        data.insert("total".to_string(), json!(results.len()));
        data.insert("results".to_string(), Value::Array(results));
        Ok(ToolOutput::ok(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;

    fn corpus() -> Arc<Corpus> {
        Arc::new(
            Corpus::from_documents(vec![
                Document::new(
                    "ml-intro",
                    "Machine learning is a field of artificial intelligence. It learns patterns from data.",
                )
                .with_source("handbook.pdf")
                .with_page(3),
                Document::new("cooking", "Bread needs flour, water, salt and yeast."),
            ])
            .unwrap(),
        )
    }

    fn params(v: Value) -> ToolParams {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_returns_citation_metadata() {
        let tool = VectorSearchTool::new(corpus());
        let out = tool
            .execute(&params(json!({"query": "What is machine learning?", "top_k": 1})))
            .await
            .unwrap();

        assert!(out.success);
        let results = out.data["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["document_id"], "ml-intro");
        assert_eq!(results[0]["chunk_id"], "ml-intro#0");
        assert_eq!(results[0]["page_number"], 3);
        assert_eq!(results[0]["source"], "handbook.pdf");
        assert!(results[0]["content"]
            .as_str()
            .unwrap()
            .contains("Machine learning"));
    }

    #[tokio::test]
    async fn test_no_hits_is_still_success() {
        let tool = VectorSearchTool::new(corpus());
        let out = tool
            .execute(&params(json!({"query": "what is it"})))
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(out.data["total"], 0);
    }

    #[tokio::test]
    async fn test_missing_query_is_invalid() {
        let tool = VectorSearchTool::new(corpus());
        let err = tool.execute(&params(json!({"top_k": 2}))).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}
