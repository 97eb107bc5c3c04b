//! Full pipeline E2E tests for the agentic RAG orchestrator.
//!
//! Covers a corpus loaded from disk flowing through planning, tool
//! execution, reflection and answer assembly for each query intent.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use e2e_tests::{pipeline_with, sample_web_hits, TestHarness};
use rag_orchestrator::{ConversationMemory, Role, NO_INFORMATION_ANSWER};
use rag_planner::{Planner, QueryPlanner};
use rag_types::{ExecutionPhase, PipelineConfig, QueryIntent, StepStatus, VECTOR_SEARCH};

/// Definitional query over the sample corpus.
///
/// Checks the raw tool output first, then the assembled response.
#[tokio::test]
async fn test_definitional_query_end_to_end() {
    // 1. Create harness
    let harness = TestHarness::new();
    assert_eq!(harness.corpus.document_count(), 5);

    // 2. The vector tool finds passages on its own
    let registry = harness.registry();
    let params = json!({"query": "What is machine learning?", "top_k": 3});
    let direct = registry
        .execute(VECTOR_SEARCH, params.as_object().unwrap())
        .await;
    assert!(direct.success);
    let items = direct.result_items();
    assert!(!items.is_empty());
    assert!(items
        .iter()
        .all(|item| item.get("content").and_then(Value::as_str).is_some()));

    // 3. Run the pipeline
    let rag = harness.pipeline(PipelineConfig::default());
    let response = rag.query("What is machine learning?", None).await.unwrap();

    // 4. Answer, confidence and trace are populated
    assert!(!response.answer.is_empty());
    assert!(response.answer != NO_INFORMATION_ANSWER);
    assert!(response.confidence.overall > 0.0 && response.confidence.overall <= 1.0);
    assert!(response.trace.iterations_used >= 1);
    assert!(response.trace.total_duration_ms >= 0.0);
    assert!(response.quality.is_some());

    // 5. Sources carry citation metadata from the corpus file
    assert!(!response.sources.is_empty());
    assert!(response
        .sources
        .iter()
        .all(|s| s.chunk_id.is_some() && s.start_offset.is_some()));
    assert!(response
        .sources
        .iter()
        .any(|s| s.source.ends_with(".md") || s.source.ends_with(".pdf")));
}

/// Calculation query answered by the calculator tool.
#[tokio::test]
async fn test_calculation_query() {
    let harness = TestHarness::new();
    let rag = harness.pipeline(PipelineConfig::default());

    let response = rag.query("What is 15% of 200?", None).await.unwrap();

    assert!(response
        .answer
        .contains("Calculation result: (15/100)*200 = 30"));
    let first = &response.trace.steps[0];
    assert_eq!(first.tool_name, "calculator");
    assert_eq!(first.status, StepStatus::Completed);
}

/// Comparison query is split into one step per side plus a joining step.
#[tokio::test]
async fn test_comparison_query_plan_and_answer() {
    let harness = TestHarness::new();
    let query = "Compare supervised learning vs unsupervised learning";

    // 1. Plan shape
    let plan = QueryPlanner::default().create_plan(query).unwrap();
    assert_eq!(plan.intent_analysis.intent, QueryIntent::Comparison);
    assert_eq!(plan.len(), 3);
    assert_eq!(plan.steps()[2].depends_on.len(), 2);

    // 2. Every planned step runs in order
    let rag = harness.pipeline(PipelineConfig::default());
    let response = rag.query(query, None).await.unwrap();
    let planned: Vec<u32> = response
        .trace
        .steps
        .iter()
        .filter(|s| s.phase == ExecutionPhase::Plan)
        .map(|s| s.step_number)
        .collect();
    assert_eq!(planned, vec![1, 2, 3]);
    assert!(response.trace.warnings.is_empty());

    // 3. The compared topics are cited
    let cited: Vec<&str> = response
        .sources
        .iter()
        .map(|s| s.document_id.as_str())
        .collect();
    assert!(cited.contains(&"supervised") || cited.contains(&"unsupervised"));
}

/// Time-sensitive query is routed to web search and cites URLs.
#[tokio::test]
async fn test_current_events_uses_web_search() {
    let harness = TestHarness::new();
    let rag = pipeline_with(
        harness.registry_with_web(sample_web_hits()),
        PipelineConfig::default(),
    );

    let response = rag
        .query("What is the latest news about machine learning?", None)
        .await
        .unwrap();

    assert_eq!(response.trace.steps[0].tool_name, "web_search");
    assert!(response.answer.contains("efficient training"));
    let web_source = response
        .sources
        .iter()
        .find(|s| s.document_id == "https://news.example.com/ml")
        .expect("web hit should be cited");
    assert_eq!(web_source.source, "web");
}

/// Follow-up question with conversation memory.
#[tokio::test]
async fn test_follow_up_with_memory() {
    let harness = TestHarness::new();
    let rag = harness.pipeline(PipelineConfig::default());
    let mut memory = ConversationMemory::default();

    // 1. First turn
    let first = rag
        .query("What is machine learning?", Some(&mut memory))
        .await
        .unwrap();

    // 2. Follow-up turn
    rag.query("How do supervised models learn?", Some(&mut memory))
        .await
        .unwrap();

    // 3. Both turns are recorded in order
    let roles: Vec<Role> = memory.messages().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    let context = memory.get_context();
    assert!(context.starts_with("User: What is machine learning?"));
    assert!(context.contains(&format!("Assistant: {}", first.answer)));
    assert_eq!(
        memory.planning_context("And unsupervised ones?"),
        "What is machine learning?; How do supervised models learn?; And unsupervised ones?"
    );
}

/// Markdown rendering of a full response.
#[tokio::test]
async fn test_markdown_rendering() {
    let harness = TestHarness::new();
    let rag = harness.pipeline(PipelineConfig::default());

    let response = rag
        .query("What is retrieval augmented generation?", None)
        .await
        .unwrap();
    let markdown = response.to_markdown();

    assert!(markdown.starts_with("## Answer"));
    assert!(markdown.contains(&response.answer));
}
