//! # rag-orchestrator
//!
//! The agentic RAG loop: plan, execute, synthesize, reflect, correct.
//!
//! ## Core Concepts
//!
//! - **AgenticRag**: Runs one query end to end and returns an
//!   [`AgenticRagResponse`](rag_types::AgenticRagResponse) with answer,
//!   confidence, quality, sources and execution trace
//! - **Synthesis**: Extractive answer built from successful tool results
//! - **Corrections**: Each correction action maps to one tool call
//! - **ConversationMemory**: Optional per-conversation context, owned by the
//!   caller and passed into each query
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rag_orchestrator::{AgenticRag, ConversationMemory};
//!
//! let rag = AgenticRag::new(registry, Arc::new(QueryPlanner::default()), PipelineConfig::default());
//! let mut memory = ConversationMemory::default();
//! let response = rag.query("What is machine learning?", Some(&mut memory)).await?;
//! println!("{}", response.to_markdown());
//! ```

pub mod agentic;
pub mod corrections;
pub mod memory;
pub mod sources;
pub mod synthesis;

pub use agentic::{AgenticRag, DEFAULT_TOP_K};
pub use corrections::{CorrectionContext, CorrectionRoute};
pub use memory::{ConversationMemory, Message, Role};
pub use sources::collect_sources;
pub use synthesis::{extract_parts, synthesize, NO_INFORMATION_ANSWER, NO_RELEVANT_ANSWER};
