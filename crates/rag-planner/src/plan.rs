//! Query plan: an arena of steps with a per-step state machine.
//!
//! Steps live in a `Vec` and are addressed by [`StepId`]. A step may only
//! depend on steps added before it, so every plan is acyclic by
//! construction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use rag_types::{IntentAnalysis, StepStatus, ToolParams};

/// Index of a step within its plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub usize);

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0 + 1)
    }
}

/// Plan construction or transition failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Cannot plan an empty query")]
    EmptyQuery,

    #[error("Unknown step {0}")]
    UnknownStep(StepId),

    #[error("Invalid transition for step {step}: {from} -> {to}")]
    InvalidTransition {
        step: StepId,
        from: StepStatus,
        to: StepStatus,
    },

    #[error("Step {step} cannot depend on {dependency}: dependencies must be earlier steps")]
    InvalidDependency { step: StepId, dependency: StepId },
}

/// Tool bound to a step, with the heuristic that chose it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSelection {
    pub tool_name: String,

    /// Confidence in the selection (0.0-1.0)
    pub confidence: f64,

    pub parameters: ToolParams,

    /// Why this tool was chosen
    pub reason: String,
}

impl ToolSelection {
    pub fn new(tool_name: impl Into<String>, parameters: ToolParams) -> Self {
        Self {
            tool_name: tool_name.into(),
            confidence: 0.5,
            parameters,
            reason: String::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// One unit of planned work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryStep {
    pub id: StepId,

    /// 1-based position in the plan
    pub step_number: u32,

    pub description: String,
    pub sub_query: String,
    pub tool_selection: ToolSelection,

    /// Steps that must complete before this one is ready
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<StepId>,

    pub status: StepStatus,

    /// Tool payload, set when the step reaches a terminal status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_payload: Option<Map<String, Value>>,
}

/// Decomposition of one query into dependent steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub original_query: String,
    pub intent_analysis: IntentAnalysis,
    steps: Vec<QueryStep>,
}

impl QueryPlan {
    pub fn new(original_query: impl Into<String>, intent_analysis: IntentAnalysis) -> Self {
        Self {
            original_query: original_query.into(),
            intent_analysis,
            steps: Vec::new(),
        }
    }

    /// Append a pending step.
    pub fn add_step(
        &mut self,
        description: impl Into<String>,
        sub_query: impl Into<String>,
        tool_selection: ToolSelection,
        depends_on: Vec<StepId>,
    ) -> Result<StepId, PlanError> {
        let id = StepId(self.steps.len());
        if let Some(dependency) = depends_on.iter().find(|d| d.0 >= id.0) {
            return Err(PlanError::InvalidDependency {
                step: id,
                dependency: *dependency,
            });
        }

        self.steps.push(QueryStep {
            id,
            step_number: id.0 as u32 + 1,
            description: description.into(),
            sub_query: sub_query.into(),
            tool_selection,
            depends_on,
            status: StepStatus::Pending,
            result_payload: None,
        });
        Ok(id)
    }

    pub fn steps(&self) -> &[QueryStep] {
        &self.steps
    }

    pub fn step(&self, id: StepId) -> Option<&QueryStep> {
        self.steps.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Pending steps whose dependencies have all completed.
    pub fn get_ready_steps(&self) -> Vec<StepId> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending)
            .filter(|s| {
                s.depends_on
                    .iter()
                    .all(|d| self.steps[d.0].status == StepStatus::Completed)
            })
            .map(|s| s.id)
            .collect()
    }

    /// Pending steps that can never become ready because a dependency failed.
    pub fn blocked_steps(&self) -> Vec<StepId> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending)
            .filter(|s| {
                s.depends_on
                    .iter()
                    .any(|d| self.steps[d.0].status == StepStatus::Failed)
            })
            .map(|s| s.id)
            .collect()
    }

    /// Move a step along `Pending -> InProgress -> {Completed | Failed}`.
    ///
    /// A payload given on a terminal transition is stored on the step.
    pub fn update_step_status(
        &mut self,
        id: StepId,
        status: StepStatus,
        result: Option<Map<String, Value>>,
    ) -> Result<(), PlanError> {
        let step = self.steps.get_mut(id.0).ok_or(PlanError::UnknownStep(id))?;

        let allowed = matches!(
            (step.status, status),
            (StepStatus::Pending, StepStatus::InProgress)
                | (StepStatus::InProgress, StepStatus::Completed)
                | (StepStatus::InProgress, StepStatus::Failed)
        );
        if !allowed {
            return Err(PlanError::InvalidTransition {
                step: id,
                from: step.status,
                to: status,
            });
        }

        step.status = status;
        if status.is_terminal() {
            step.result_payload = result;
        }
        Ok(())
    }

    /// True when no step is pending or in progress.
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    pub fn completed_steps(&self) -> Vec<&QueryStep> {
        self.steps_with(StepStatus::Completed)
    }

    pub fn failed_steps(&self) -> Vec<&QueryStep> {
        self.steps_with(StepStatus::Failed)
    }

    /// Fraction of steps in a terminal status. An empty plan is fully complete.
    pub fn completion_ratio(&self) -> f64 {
        if self.steps.is_empty() {
            return 1.0;
        }
        let done = self.steps.iter().filter(|s| s.status.is_terminal()).count();
        done as f64 / self.steps.len() as f64
    }

    fn steps_with(&self, status: StepStatus) -> Vec<&QueryStep> {
        self.steps.iter().filter(|s| s.status == status).collect()
    }
}
