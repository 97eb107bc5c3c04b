//! # rag-tools
//!
//! Tool registry and built-in tools for the agentic RAG pipeline.
//!
//! ## Core Concepts
//!
//! - **Tool**: A named async capability taking JSON params and returning a payload
//! - **ToolRegistry**: Name-indexed dispatch that never fails; errors and
//!   timeouts become failed `ToolResult`s
//! - **Corpus**: Chunked, embedded documents searched by `vector_search`
//! - **WebSearchProvider**: Backend behind `web_search` (HTTP or static)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rag_tools::{Corpus, Document, ToolRegistry};
//!
//! let corpus = Arc::new(Corpus::from_documents(vec![
//!     Document::new("ml", "Machine learning is a field of AI."),
//! ])?);
//! let registry = ToolRegistry::with_defaults(corpus, None, &ToolsConfig::default(), 5);
//!
//! let result = registry.execute("vector_search", &params).await;
//! ```
//!
//! ## Modules
//!
//! - [`registry`]: Tool registration and invocation
//! - [`vector`], [`web`], [`calculator`]: Built-in tools
//! - [`corpus`], [`embedding`]: Document chunking and embedding
//! - [`mock`]: Scriptable tool for tests

pub mod calculator;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod mock;
pub mod registry;
pub mod tool;
pub mod vector;
pub mod web;

pub use calculator::{evaluate, format_number, CalcError, CalculatorTool, MAX_NESTING};
pub use corpus::{chunk_document, Chunk, ChunkingConfig, Corpus, Document, ScoredChunk};
pub use embedding::{Embedding, EmbeddingError, EmbeddingModel, HashingEmbedder, ModelInfo};
pub use error::{CorpusError, ToolError};
pub use mock::MockTool;
pub use registry::ToolRegistry;
pub use tool::{optional_usize, required_str, Tool, ToolOutput};
pub use vector::VectorSearchTool;
pub use web::{
    HttpWebSearch, HttpWebSearchConfig, StaticWebSearch, WebHit, WebSearchProvider, WebSearchTool,
};
