//! Error types for the agentic RAG pipeline.
//!
//! Only [`RagError`] ever escapes `AgenticRag::query`. Everything that goes
//! wrong after input validation is folded into [`RagError::Retrieval`],
//! carrying the query that failed and a [`PipelineError`] cause.

use thiserror::Error;

/// Error returned to callers of the pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// Query rejected before any work began (empty or blank text).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Planning, execution or synthesis failed.
    #[error("Retrieval failed for query '{query}': {cause}")]
    Retrieval {
        /// The query as submitted by the caller
        query: String,
        /// Underlying failure
        #[source]
        cause: PipelineError,
    },
}

impl RagError {
    /// Wrap a pipeline failure for the given query.
    pub fn retrieval(query: impl Into<String>, cause: PipelineError) -> Self {
        RagError::Retrieval {
            query: query.into(),
            cause,
        }
    }

    /// The failed query, if this is a retrieval failure.
    pub fn query(&self) -> Option<&str> {
        match self {
            RagError::Retrieval { query, .. } => Some(query),
            RagError::InvalidInput(_) => None,
        }
    }

    /// Returns true for input validation errors.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, RagError::InvalidInput(_))
    }
}

/// Internal failure inside the pipeline, wrapped by [`RagError::Retrieval`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The planner could not produce a plan.
    #[error("Planning failed: {0}")]
    Plan(String),

    /// A plan step could not be transitioned or dispatched.
    #[error("Step execution failed: {0}")]
    Step(String),

    /// Any other invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration load or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying config source could not be read or parsed
    #[error("Configuration error: {0}")]
    Load(String),

    /// A value is out of range
    #[error("Invalid configuration value for {field}: {message}")]
    Invalid {
        /// Dotted path of the offending field
        field: String,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
