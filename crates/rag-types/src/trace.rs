//! Append-only execution trace for one pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::ToolResult;

/// Status of a plan step.
///
/// `Pending -> InProgress -> {Completed | Failed}`; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of the pipeline produced a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    /// A planned step
    #[default]
    Plan,
    /// A corrective call issued by reflection
    Correction,
}

/// One tool dispatch recorded in the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub step_number: u32,
    pub description: String,
    pub tool_name: String,
    pub tool_result: ToolResult,
    pub duration_ms: f64,
    pub status: StepStatus,
    #[serde(default)]
    pub phase: ExecutionPhase,
}

/// Trace of a single `query()` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    /// Request id (ULID)
    pub query_id: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<ExecutionStep>,
    pub total_duration_ms: f64,
    /// 1 for the initial pass plus one per corrective iteration
    pub iterations_used: u32,
    /// Degradations that did not abort the run (deadlocks, exhausted budgets)
    pub warnings: Vec<String>,
}

impl ExecutionTrace {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            started_at: Utc::now(),
            steps: Vec::new(),
            total_duration_ms: 0.0,
            iterations_used: 0,
            warnings: Vec::new(),
        }
    }

    pub fn push(&mut self, step: ExecutionStep) {
        self.steps.push(step);
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Step number to use for the next entry.
    pub fn next_step_number(&self) -> u32 {
        self.steps.len() as u32 + 1
    }

    pub fn successful_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    pub fn failed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count()
    }

    pub fn correction_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.phase == ExecutionPhase::Correction)
            .count()
    }

    /// Convert to a user-friendly summary string.
    pub fn to_summary(&self) -> String {
        let mut parts = Vec::new();

        parts.push(format!(
            "Steps: {} ({} ok, {} failed)",
            self.steps.len(),
            self.successful_steps(),
            self.failed_steps()
        ));

        let corrections = self.correction_steps();
        if corrections > 0 {
            parts.push(format!("Corrections: {}", corrections));
        }

        parts.push(format!("Iterations: {}", self.iterations_used));
        parts.push(format!("Time: {:.1}ms", self.total_duration_ms));

        if !self.warnings.is_empty() {
            parts.push(format!("Warnings: {}", self.warnings.len()));
        }

        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn step(n: u32, status: StepStatus, phase: ExecutionPhase) -> ExecutionStep {
        let result = if status == StepStatus::Completed {
            ToolResult::success("vector_search", Map::new(), 1.0)
        } else {
            ToolResult::failure("vector_search", "down", 1.0)
        };
        ExecutionStep {
            step_number: n,
            description: "search".to_string(),
            tool_name: "vector_search".to_string(),
            tool_result: result,
            duration_ms: 1.0,
            status,
            phase,
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!StepStatus::Pending.is_terminal());
        assert!(!StepStatus::InProgress.is_terminal());
        assert!(StepStatus::Completed.is_terminal());
        assert!(StepStatus::Failed.is_terminal());
    }

    #[test]
    fn test_trace_counts_and_summary() {
        let mut trace = ExecutionTrace::new("01HX");
        trace.push(step(1, StepStatus::Completed, ExecutionPhase::Plan));
        trace.push(step(2, StepStatus::Failed, ExecutionPhase::Plan));
        trace.push(step(3, StepStatus::Completed, ExecutionPhase::Correction));
        trace.iterations_used = 2;
        trace.warn("deadlock");

        assert_eq!(trace.next_step_number(), 4);
        assert_eq!(trace.successful_steps(), 2);
        assert_eq!(trace.failed_steps(), 1);
        assert_eq!(trace.correction_steps(), 1);

        let summary = trace.to_summary();
        assert!(summary.contains("Steps: 3 (2 ok, 1 failed)"));
        assert!(summary.contains("Corrections: 1"));
        assert!(summary.contains("Iterations: 2"));
        assert!(summary.contains("Warnings: 1"));
    }
}
