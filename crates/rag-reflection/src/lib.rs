//! # rag-reflection
//!
//! Confidence scoring and answer reflection for the agentic RAG pipeline.
//!
//! ## Core Concepts
//!
//! - **Confidence**: a process-level score over the tool results gathered so
//!   far. It says how much to trust the evidence, not the answer.
//! - **Quality**: an answer-level score along seven dimensions, with the gaps
//!   and recommendations that drive self-correction.
//! - **Correction strategies**: ranked remedial actions the orchestrator maps
//!   to extra tool calls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rag_reflection::{ConfidenceScorer, ReflectionEngine};
//!
//! let confidence = ConfidenceScorer::default().calculate(&results, intent, 1, Some(&answer));
//! let engine = ReflectionEngine::default();
//! let assessment = engine.assess_quality(&answer, query, &results, &plan, 1);
//! if engine.should_iterate(&assessment, 1, Some(&confidence)) {
//!     let strategies = engine.generate_correction_strategies(&assessment);
//! }
//! ```

pub mod confidence;
pub mod engine;
pub mod markers;

pub use confidence::{
    answer_completeness, result_diversity, tool_reliability, ConfidenceScorer,
    NEUTRAL_COMPLETENESS,
};
pub use engine::ReflectionEngine;
pub use markers::{evidence_fragments, find_markers, UNCERTAINTY_MARKERS};
