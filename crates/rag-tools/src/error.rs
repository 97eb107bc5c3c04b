//! Error types for tools and the corpus.

use thiserror::Error;

use crate::calculator::CalcError;
use crate::embedding::EmbeddingError;

/// Tool-level failure.
///
/// Never escapes the registry: `ToolRegistry::execute` folds every variant
/// into a failed `ToolResult`.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Parameters missing or of the wrong type
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Backend (HTTP service, index) returned an error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Backend refused the request itself (4xx other than 429)
    #[error("Request rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Backend asked us to slow down
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Tool did not finish within its deadline
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// Expression could not be evaluated
    #[error("Calculation error: {0}")]
    Calculation(#[from] CalcError),

    /// Text could not be embedded
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
}

impl ToolError {
    /// Whether repeating the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::RateLimited | Self::Timeout(_))
    }
}

/// Corpus construction or loading failure.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse corpus: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
}
