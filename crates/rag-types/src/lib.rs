//! # rag-types
//!
//! Shared domain types for the agentic RAG pipeline.
//!
//! This crate defines the data structures passed between the planner,
//! tools, reflection and orchestrator crates:
//! - Intent: classified purpose of a query
//! - Tool results: the normalized envelope every tool call produces
//! - Confidence and quality: process-level and answer-level scores
//! - Trace and response: what a caller gets back from one query
//! - Settings: layered configuration for every component

pub mod confidence;
pub mod config;
pub mod error;
pub mod intent;
pub mod quality;
pub mod response;
pub mod tool;
pub mod trace;

pub use confidence::{ConfidenceFactor, ConfidenceScore};
pub use config::{
    DimensionWeights, ExecutionMode, MemoryConfig, PipelineConfig, PlannerConfig,
    ReflectionConfig, ScorerConfig, Settings, ToolsConfig, WebSearchConfig,
};
pub use error::{ConfigError, PipelineError, RagError};
pub use intent::{IntentAnalysis, QueryIntent};
pub use quality::{
    AnswerQualityAssessment, CorrectionActionType, CorrectionStrategy, Gap, GapKind,
    QualityDimension,
};
pub use response::{AgenticRagResponse, SourceRecord};
pub use tool::{ToolParams, ToolResult, CALCULATOR, VECTOR_SEARCH, WEB_SEARCH};
pub use trace::{ExecutionPhase, ExecutionStep, ExecutionTrace, StepStatus};
