//! # rag-planner
//!
//! Query planning for the agentic RAG pipeline.
//!
//! A query is classified into an intent (retrieval, synthesis, calculation,
//! comparison, current events) and decomposed into a [`QueryPlan`]: a small
//! DAG of steps, each bound to one tool invocation and tracked through
//! `Pending -> InProgress -> {Completed | Failed}`.
//!
//! ```rust,ignore
//! use rag_planner::{Planner, QueryPlanner};
//!
//! let planner = QueryPlanner::default();
//! let mut plan = planner.create_plan("Compare BM25 vs dense retrieval")?;
//! for id in plan.get_ready_steps() {
//!     plan.update_step_status(id, StepStatus::InProgress, None)?;
//! }
//! ```

pub mod intent;
pub mod plan;
pub mod planner;

pub use intent::{extract_entities, extract_expression, ClassifierConfig, IntentClassifier};
pub use plan::{PlanError, QueryPlan, QueryStep, StepId, ToolSelection};
pub use planner::{split_clauses, Planner, QueryPlanner};
