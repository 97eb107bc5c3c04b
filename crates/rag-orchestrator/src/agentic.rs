//! The agentic RAG loop.
//!
//! One `query()` call runs:
//! 1. validate the query text
//! 2. optionally fold conversation context into the planning query
//! 3. plan, then execute ready steps until the plan is complete or stuck
//! 4. synthesize a provisional answer
//! 5. reflect: score, assess, correct and re-synthesize while reflection
//!    asks for another round
//! 6. finalize confidence, quality, sources and the trace
//!
//! Tool failures never abort the run. Anything else that goes wrong after
//! validation surfaces as a single [`RagError::Retrieval`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, error, info, warn};
use ulid::Ulid;

use rag_planner::{PlanError, Planner, QueryPlan, StepId};
use rag_reflection::{ConfidenceScorer, ReflectionEngine};
use rag_tools::ToolRegistry;
use rag_types::{
    AgenticRagResponse, AnswerQualityAssessment, CorrectionStrategy, ExecutionMode,
    ExecutionPhase, ExecutionStep, ExecutionTrace, PipelineConfig, PipelineError, RagError,
    StepStatus, ToolParams, ToolResult, VECTOR_SEARCH,
};

use crate::corrections::{CorrectionContext, CorrectionRoute};
use crate::memory::{ConversationMemory, Role};
use crate::sources::collect_sources;
use crate::synthesis::synthesize;

/// `top_k` for corrective retrieval when the plan carries none.
pub const DEFAULT_TOP_K: usize = 5;

/// Plan, execute, reflect and correct over a tool registry.
pub struct AgenticRag {
    registry: Arc<ToolRegistry>,
    planner: Arc<dyn Planner>,
    scorer: ConfidenceScorer,
    reflection: ReflectionEngine,
    config: PipelineConfig,
}

impl AgenticRag {
    pub fn new(
        registry: Arc<ToolRegistry>,
        planner: Arc<dyn Planner>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            planner,
            scorer: ConfidenceScorer::default(),
            reflection: ReflectionEngine::default(),
            config,
        }
    }

    pub fn with_scorer(mut self, scorer: ConfidenceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_reflection(mut self, reflection: ReflectionEngine) -> Self {
        self.reflection = reflection;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer `text`.
    ///
    /// A blank query is rejected with [`RagError::InvalidInput`] before any
    /// tool runs. When `memory` is given, its recent user questions are
    /// folded into planning and this exchange is appended after a
    /// successful run.
    pub async fn query(
        &self,
        text: &str,
        memory: Option<&mut ConversationMemory>,
    ) -> Result<AgenticRagResponse, RagError> {
        let query = text.trim();
        if query.is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }

        let planning_query = match memory.as_deref() {
            Some(memory) if self.config.inject_memory_context => memory.planning_context(query),
            _ => query.to_string(),
        };

        let response = self
            .run(query, &planning_query)
            .await
            .map_err(|cause| {
                error!(query = query, error = %cause, "Agentic query failed");
                RagError::retrieval(text, cause)
            })?;

        if let Some(memory) = memory {
            memory.add_message(Role::User, query);
            memory.add_message(Role::Assistant, response.answer.clone());
        }

        Ok(response)
    }

    async fn run(
        &self,
        query: &str,
        planning_query: &str,
    ) -> Result<AgenticRagResponse, PipelineError> {
        let started = Instant::now();
        let budget = Duration::from_millis(self.config.max_total_time_ms);
        let mut trace = ExecutionTrace::new(Ulid::new().to_string());

        info!(query_id = %trace.query_id, query = query, "Starting agentic query");

        let mut plan = self
            .planner
            .create_plan(planning_query)
            .map_err(|e| PipelineError::Plan(e.to_string()))?;
        let intent = plan.intent_analysis.intent;

        let mut results: Vec<ToolResult> = Vec::new();
        self.execute_plan(&mut plan, &mut results, &mut trace).await?;

        let mut answer = synthesize(&results, self.config.max_answer_parts);
        let mut iteration: u32 = 1;
        let mut quality: Option<AnswerQualityAssessment> = None;

        if self.config.enable_reflection {
            loop {
                let confidence = self.scorer.calculate(&results, intent, iteration, Some(&answer));
                let assessment =
                    self.reflection
                        .assess_quality(&answer, query, &results, &plan, iteration);
                let iterate = self
                    .reflection
                    .should_iterate(&assessment, iteration, Some(&confidence));

                if !iterate {
                    quality = Some(assessment);
                    break;
                }

                if started.elapsed() >= budget {
                    warn!(
                        iteration,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        budget_ms = self.config.max_total_time_ms,
                        "Time budget exhausted, stopping refinement"
                    );
                    trace.warn(format!(
                        "Time budget of {}ms exhausted after {} iteration(s)",
                        self.config.max_total_time_ms, iteration
                    ));
                    quality = Some(assessment);
                    break;
                }

                let strategies = self.reflection.generate_correction_strategies(&assessment);
                if strategies.is_empty() {
                    quality = Some(assessment);
                    break;
                }

                let context = CorrectionContext {
                    query,
                    keywords: &plan.intent_analysis.keywords,
                    top_k: plan_top_k(&plan),
                };
                self.execute_corrections(&strategies, &context, &mut results, &mut trace)
                    .await;

                answer = synthesize(&results, self.config.max_answer_parts);
                iteration += 1;
            }
        }

        let confidence = self.scorer.calculate(&results, intent, iteration, Some(&answer));
        let sources = collect_sources(&results);

        trace.iterations_used = iteration;
        trace.total_duration_ms = elapsed_ms(started.elapsed());

        info!(
            query_id = %trace.query_id,
            iterations = iteration,
            steps = trace.steps.len(),
            sources = sources.len(),
            confidence = confidence.overall,
            quality = quality.as_ref().map(|q| q.overall_score),
            elapsed_ms = trace.total_duration_ms,
            "Agentic query complete"
        );

        Ok(AgenticRagResponse {
            answer,
            confidence,
            sources,
            trace,
            quality,
        })
    }

    async fn execute_plan(
        &self,
        plan: &mut QueryPlan,
        results: &mut Vec<ToolResult>,
        trace: &mut ExecutionTrace,
    ) -> Result<(), PipelineError> {
        while !plan.is_complete() {
            let ready = plan.get_ready_steps();
            if ready.is_empty() {
                let stuck: Vec<String> = plan
                    .steps()
                    .iter()
                    .filter(|s| !s.status.is_terminal())
                    .map(|s| s.id.to_string())
                    .collect();
                let blocked = plan.blocked_steps().len();
                warn!(
                    unfinished = stuck.len(),
                    blocked_by_failure = blocked,
                    "Plan has no ready steps, continuing with partial results"
                );
                trace.warn(format!(
                    "Plan stalled with unfinished steps {}",
                    stuck.join(", ")
                ));
                break;
            }

            match self.config.execution_mode {
                ExecutionMode::Sequential => {
                    for id in ready {
                        let (tool, params) = start_step(plan, id)?;
                        let start = Instant::now();
                        let result = self.registry.execute(&tool, &params).await;
                        finish_step(plan, id, result, start.elapsed(), results, trace)?;
                    }
                }
                ExecutionMode::Concurrent => {
                    let mut calls: Vec<(StepId, String, ToolParams)> = Vec::new();
                    for id in ready {
                        let (tool, params) = start_step(plan, id)?;
                        calls.push((id, tool, params));
                    }
                    debug!(batch = calls.len(), "Dispatching ready steps concurrently");

                    let outcomes = join_all(calls.iter().map(|(id, tool, params)| async move {
                        let start = Instant::now();
                        let result = self.registry.execute(tool, params).await;
                        (*id, result, start.elapsed())
                    }))
                    .await;

                    for (id, result, elapsed) in outcomes {
                        finish_step(plan, id, result, elapsed, results, trace)?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn execute_corrections(
        &self,
        strategies: &[CorrectionStrategy],
        context: &CorrectionContext<'_>,
        results: &mut Vec<ToolResult>,
        trace: &mut ExecutionTrace,
    ) {
        for strategy in strategies
            .iter()
            .take(self.config.max_corrections_per_iteration)
        {
            let route = CorrectionRoute::for_action(strategy.action_type);
            let tool = if self.registry.has_tool(route.tool_name) {
                route.tool_name
            } else {
                debug!(
                    action = %strategy.action_type,
                    tool = route.tool_name,
                    "Correction tool not registered, using vector search"
                );
                VECTOR_SEARCH
            };
            let params = route.params(context, strategy);

            info!(
                action = %strategy.action_type,
                dimension = %strategy.target_dimension,
                priority = strategy.priority,
                tool = tool,
                "Executing correction"
            );

            let start = Instant::now();
            let result = self.registry.execute(tool, &params).await;
            let status = status_of(&result);

            trace.push(ExecutionStep {
                step_number: trace.next_step_number(),
                description: format!(
                    "Correction ({}): {}",
                    strategy.action_type, strategy.description
                ),
                tool_name: tool.to_string(),
                tool_result: result.clone(),
                duration_ms: elapsed_ms(start.elapsed()),
                status,
                phase: ExecutionPhase::Correction,
            });
            results.push(result);
        }
    }
}

fn step_error(e: PlanError) -> PipelineError {
    PipelineError::Step(e.to_string())
}

/// Mark a ready step in progress and hand back its tool call.
fn start_step(plan: &mut QueryPlan, id: StepId) -> Result<(String, ToolParams), PipelineError> {
    plan.update_step_status(id, StepStatus::InProgress, None)
        .map_err(step_error)?;
    let step = plan
        .step(id)
        .ok_or_else(|| step_error(PlanError::UnknownStep(id)))?;
    debug!(
        step = step.step_number,
        tool = %step.tool_selection.tool_name,
        sub_query = %step.sub_query,
        "Dispatching step"
    );
    Ok((
        step.tool_selection.tool_name.clone(),
        step.tool_selection.parameters.clone(),
    ))
}

/// Record the outcome of a dispatched step on the plan and the trace.
fn finish_step(
    plan: &mut QueryPlan,
    id: StepId,
    result: ToolResult,
    elapsed: Duration,
    results: &mut Vec<ToolResult>,
    trace: &mut ExecutionTrace,
) -> Result<(), PipelineError> {
    let status = status_of(&result);
    plan.update_step_status(id, status, Some(result.data.clone()))
        .map_err(step_error)?;
    let step = plan
        .step(id)
        .ok_or_else(|| step_error(PlanError::UnknownStep(id)))?;

    if result.success {
        debug!(step = step.step_number, tool = %result.tool_name, "Step completed");
    } else {
        warn!(
            step = step.step_number,
            tool = %result.tool_name,
            error = result.error.as_deref().unwrap_or("unknown"),
            "Step failed"
        );
    }

    trace.push(ExecutionStep {
        step_number: trace.next_step_number(),
        description: step.description.clone(),
        tool_name: step.tool_selection.tool_name.clone(),
        tool_result: result.clone(),
        duration_ms: elapsed_ms(elapsed),
        status,
        phase: ExecutionPhase::Plan,
    });
    results.push(result);
    Ok(())
}

fn status_of(result: &ToolResult) -> StepStatus {
    if result.success {
        StepStatus::Completed
    } else {
        StepStatus::Failed
    }
}

/// `top_k` of the plan's first vector search step.
fn plan_top_k(plan: &QueryPlan) -> usize {
    plan.steps()
        .iter()
        .filter(|s| s.tool_selection.tool_name == VECTOR_SEARCH)
        .find_map(|s| s.tool_selection.parameters.get("top_k"))
        .and_then(|v| v.as_u64())
        .map(|k| k as usize)
        .unwrap_or(DEFAULT_TOP_K)
}

fn elapsed_ms(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_planner::{QueryPlanner, ToolSelection};
    use rag_tools::{Corpus, Document, MockTool};
    use rag_types::{IntentAnalysis, MemoryConfig, ReflectionConfig, ToolsConfig};
    use serde_json::json;
    use std::sync::Mutex;

    fn corpus() -> Arc<Corpus> {
        Arc::new(
            Corpus::from_documents(vec![
                Document::new(
                    "ml-intro",
                    "Machine learning is a field of artificial intelligence that learns patterns from data.",
                )
                .with_source("ml.md"),
                Document::new(
                    "cooking",
                    "Bread dough rises when yeast ferments the sugars in flour.",
                ),
            ])
            .unwrap(),
        )
    }

    fn rag(config: PipelineConfig) -> AgenticRag {
        let registry = ToolRegistry::with_defaults(corpus(), None, &ToolsConfig::default(), 5);
        AgenticRag::new(
            Arc::new(registry),
            Arc::new(QueryPlanner::default()),
            config,
        )
    }

    /// Planner returning a fixed plan.
    struct FixedPlanner(QueryPlan);

    impl Planner for FixedPlanner {
        fn create_plan(&self, _query: &str) -> Result<QueryPlan, PlanError> {
            Ok(self.0.clone())
        }
    }

    /// Planner recording the text it was asked to plan.
    struct RecordingPlanner {
        seen: Mutex<Vec<String>>,
        inner: QueryPlanner,
    }

    impl Planner for RecordingPlanner {
        fn create_plan(&self, query: &str) -> Result<QueryPlan, PlanError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(query.to_string());
            }
            self.inner.create_plan(query)
        }
    }

    fn selection(tool: &str) -> ToolSelection {
        ToolSelection::new(tool, json!({"query": "q"}).as_object().cloned().unwrap())
    }

    #[tokio::test]
    async fn test_blank_query_rejected_before_tools() {
        let rag = rag(PipelineConfig::default());
        for text in ["", "   "] {
            let err = rag.query(text, None).await.unwrap_err();
            assert!(err.is_invalid_input());
        }
        assert_eq!(rag.registry().invocation_count(), 0);
    }

    #[tokio::test]
    async fn test_definitional_query() {
        let rag = rag(PipelineConfig::default());
        let response = rag.query("What is machine learning?", None).await.unwrap();

        assert!(response.answer.contains("Machine learning is a field"));
        assert!(response.confidence.overall > 0.0 && response.confidence.overall <= 1.0);
        assert!(response.trace.iterations_used >= 1);
        assert!(response.sources.iter().any(|s| s.document_id == "ml-intro"));
        assert!(response.quality.is_some());
        assert!(!response.trace.query_id.is_empty());
    }

    #[tokio::test]
    async fn test_reflection_disabled_skips_assessment() {
        let rag = rag(PipelineConfig {
            enable_reflection: false,
            ..Default::default()
        });
        let response = rag.query("What is machine learning?", None).await.unwrap();

        assert!(response.quality.is_none());
        assert_eq!(response.trace.iterations_used, 1);
        assert_eq!(response.trace.correction_steps(), 0);
    }

    #[tokio::test]
    async fn test_failing_tools_degrade_but_do_not_abort() {
        let mut registry = ToolRegistry::new();
        registry.register(MockTool::new("vector_search").with_error("index offline"));
        let rag = AgenticRag::new(
            Arc::new(registry),
            Arc::new(QueryPlanner::default()),
            PipelineConfig::default(),
        );

        let response = rag.query("What is machine learning?", None).await.unwrap();
        assert_eq!(response.answer, crate::synthesis::NO_INFORMATION_ANSWER);
        assert!(response.trace.failed_steps() >= 1);
        assert!(response.sources.is_empty());
        // two corrective calls per extra iteration at most
        let corrections = response.trace.correction_steps() as u32;
        assert!(corrections > 0);
        assert!(corrections <= 2 * (response.trace.iterations_used - 1));
    }

    #[tokio::test]
    async fn test_max_iterations_bounds_loop() {
        let mut registry = ToolRegistry::new();
        registry.register(MockTool::new("vector_search").with_error("index offline"));
        let rag = AgenticRag::new(
            Arc::new(registry),
            Arc::new(QueryPlanner::default()),
            PipelineConfig::default(),
        )
        .with_reflection(ReflectionEngine::new(ReflectionConfig {
            max_iterations: 2,
            ..Default::default()
        }));

        let response = rag.query("What is machine learning?", None).await.unwrap();
        assert_eq!(response.trace.iterations_used, 2);
    }

    #[tokio::test]
    async fn test_stalled_plan_is_a_warning() {
        let mut plan = QueryPlan::new("q", IntentAnalysis::default());
        let first = plan.add_step("first", "q", selection("broken"), vec![]).unwrap();
        plan.add_step("second", "q", selection("vector_search"), vec![first])
            .unwrap();

        let mut registry = ToolRegistry::new();
        registry.register(MockTool::new("vector_search"));
        let rag = AgenticRag::new(
            Arc::new(registry),
            Arc::new(FixedPlanner(plan)),
            PipelineConfig {
                enable_reflection: false,
                ..Default::default()
            },
        );

        let response = rag.query("q", None).await.unwrap();
        assert_eq!(response.trace.steps.len(), 1);
        assert_eq!(response.trace.warnings.len(), 1);
        assert!(response.trace.warnings[0].contains("#2"));
        assert_eq!(rag.registry().invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_mode_runs_every_ready_step() {
        let mut plan = QueryPlan::new("q", IntentAnalysis::default());
        let a = plan.add_step("a", "q", selection("alpha"), vec![]).unwrap();
        let b = plan.add_step("b", "q", selection("beta"), vec![]).unwrap();
        plan.add_step("c", "q", selection("alpha"), vec![a, b]).unwrap();

        let mut registry = ToolRegistry::new();
        registry.register(MockTool::new("alpha").with_data(json!({"results": []})));
        registry.register(MockTool::new("beta").with_data(json!({"results": []})));
        let rag = AgenticRag::new(
            Arc::new(registry),
            Arc::new(FixedPlanner(plan)),
            PipelineConfig {
                enable_reflection: false,
                execution_mode: ExecutionMode::Concurrent,
                ..Default::default()
            },
        );

        let response = rag.query("q", None).await.unwrap();
        let numbers: Vec<u32> = response.trace.steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(response.trace.successful_steps(), 3);
        assert!(response.trace.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_memory_context_and_append() {
        let registry = ToolRegistry::with_defaults(corpus(), None, &ToolsConfig::default(), 5);
        let planner = Arc::new(RecordingPlanner {
            seen: Mutex::new(Vec::new()),
            inner: QueryPlanner::default(),
        });
        let rag = AgenticRag::new(Arc::new(registry), planner.clone(), PipelineConfig::default());
        let mut memory = ConversationMemory::default();

        rag.query("What is machine learning?", Some(&mut memory))
            .await
            .unwrap();
        rag.query("How does it learn patterns?", Some(&mut memory))
            .await
            .unwrap();

        assert_eq!(memory.len(), 4);
        let seen = planner.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                "What is machine learning?".to_string(),
                "What is machine learning?; How does it learn patterns?".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_evicted_question_still_reaches_planner() {
        let registry = ToolRegistry::with_defaults(corpus(), None, &ToolsConfig::default(), 5);
        let planner = Arc::new(RecordingPlanner {
            seen: Mutex::new(Vec::new()),
            inner: QueryPlanner::default(),
        });
        let rag = AgenticRag::new(Arc::new(registry), planner.clone(), PipelineConfig::default());
        let mut memory = ConversationMemory::new(MemoryConfig {
            max_tokens: 8,
            ..Default::default()
        });

        rag.query("What is machine learning?", Some(&mut memory))
            .await
            .unwrap();
        assert!(memory.summary().contains("User: What is machine learning?"));

        rag.query("How does it learn patterns?", Some(&mut memory))
            .await
            .unwrap();

        let seen = planner.seen.lock().unwrap().clone();
        assert_eq!(
            seen[1],
            "What is machine learning?; How does it learn patterns?".to_string()
        );
    }

    #[tokio::test]
    async fn test_planner_failure_is_wrapped() {
        struct Broken;
        impl Planner for Broken {
            fn create_plan(&self, _query: &str) -> Result<QueryPlan, PlanError> {
                Err(PlanError::EmptyQuery)
            }
        }

        let rag = AgenticRag::new(
            Arc::new(ToolRegistry::new()),
            Arc::new(Broken),
            PipelineConfig::default(),
        );
        let err = rag.query("What is machine learning?", None).await.unwrap_err();
        assert_eq!(err.query(), Some("What is machine learning?"));
        assert!(matches!(
            err,
            RagError::Retrieval {
                cause: PipelineError::Plan(_),
                ..
            }
        ));
    }
}
