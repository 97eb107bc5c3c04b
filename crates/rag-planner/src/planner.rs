//! Query decomposition into tool-bound steps.

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use rag_types::{IntentAnalysis, PlannerConfig, QueryIntent, CALCULATOR, VECTOR_SEARCH, WEB_SEARCH};

use crate::intent::{extract_expression, IntentClassifier};
use crate::plan::{PlanError, QueryPlan, StepId, ToolSelection};

/// Anything that can turn a query into a plan.
pub trait Planner: Send + Sync {
    fn create_plan(&self, query: &str) -> Result<QueryPlan, PlanError>;
}

/// Words that carry the arithmetic rather than the subject of a
/// calculation query.
const CALCULATION_VOCABULARY: &[&str] = &[
    "calculate", "compute", "percent", "percentage", "sum", "product", "plus", "minus", "times",
    "multiplied", "divided", "over", "square", "root", "sqrt", "abs", "mod", "modulo",
];

/// Clause separators for multi-part queries.
const CLAUSE_SEPARATORS: &[&str] = &["and", "vs", "versus"];

/// Leading words dropped from a clause before it becomes a sub-query.
const CLAUSE_LEAD_WORDS: &[&str] = &[
    "compare", "contrast", "summarize", "explain", "describe", "between", "the", "difference",
    "differences",
];

/// Heuristic planner: classify intent, then decompose by intent.
pub struct QueryPlanner {
    classifier: IntentClassifier,
    config: PlannerConfig,
}

impl QueryPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self::with_classifier(IntentClassifier::new(), config)
    }

    pub fn with_classifier(classifier: IntentClassifier, config: PlannerConfig) -> Self {
        Self { classifier, config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    fn vector_params(&self, query: &str) -> Map<String, Value> {
        params(json!({"query": query, "top_k": self.config.default_top_k}))
    }

    fn vector_selection(&self, query: &str, confidence: f64, reason: &str) -> ToolSelection {
        ToolSelection::new(VECTOR_SEARCH, self.vector_params(query))
            .with_confidence(confidence)
            .with_reason(reason)
    }

    fn plan_calculation(&self, plan: &mut QueryPlan, query: &str) -> Result<(), PlanError> {
        let confidence = plan.intent_analysis.confidence;

        let Some(expression) = extract_expression(query) else {
            plan.add_step(
                "Look up the figures needed for the calculation",
                query,
                self.vector_selection(query, 0.6, "calculation phrasing without an explicit expression"),
                vec![],
            )?;
            return Ok(());
        };

        plan.add_step(
            format!("Evaluate {}", expression),
            expression.clone(),
            ToolSelection::new(CALCULATOR, params(json!({"expression": expression})))
                .with_confidence(confidence)
                .with_reason("arithmetic expression detected"),
            vec![],
        )?;

        let subject: Vec<&str> = plan
            .intent_analysis
            .keywords
            .iter()
            .map(String::as_str)
            .filter(|k| !CALCULATION_VOCABULARY.contains(k))
            .collect();
        if !subject.is_empty() {
            let sub_query = subject.join(" ");
            plan.add_step(
                "Retrieve context for the calculation",
                sub_query.clone(),
                self.vector_selection(&sub_query, 0.5, "query has content beyond the arithmetic"),
                vec![],
            )?;
        }
        Ok(())
    }

    fn plan_multi_part(&self, plan: &mut QueryPlan, query: &str) -> Result<(), PlanError> {
        let clauses = split_clauses(query);
        let max_clauses = self.config.max_steps.saturating_sub(1);

        if clauses.len() < 2 || max_clauses < 2 {
            plan.add_step(
                "Retrieve information for the whole query",
                query,
                self.vector_selection(query, 0.7, "single-part multi-intent query"),
                vec![],
            )?;
            return Ok(());
        }

        let mut clause_steps: Vec<StepId> = Vec::new();
        for clause in clauses.iter().take(max_clauses) {
            let id = plan.add_step(
                format!("Retrieve information about {}", clause),
                clause.as_str(),
                self.vector_selection(clause, 0.75, "clause of a multi-part query"),
                vec![],
            )?;
            clause_steps.push(id);
        }

        plan.add_step(
            "Retrieve material connecting the parts",
            query,
            self.vector_selection(query, 0.6, "whole-query pass after clause retrieval"),
            clause_steps,
        )?;
        Ok(())
    }

    fn plan_current_events(&self, plan: &mut QueryPlan, query: &str) -> Result<(), PlanError> {
        if self.config.enable_web_search {
            plan.add_step(
                "Search the web for current information",
                query,
                ToolSelection::new(WEB_SEARCH, params(json!({"query": query})))
                    .with_confidence(plan.intent_analysis.confidence)
                    .with_reason("time-sensitive query"),
                vec![],
            )?;
        }
        plan.add_step(
            "Retrieve background from the corpus",
            query,
            self.vector_selection(query, 0.5, "corpus background for a time-sensitive query"),
            vec![],
        )?;
        Ok(())
    }
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

impl Planner for QueryPlanner {
    fn create_plan(&self, query: &str) -> Result<QueryPlan, PlanError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlanError::EmptyQuery);
        }

        let analysis: IntentAnalysis = self.classifier.classify(query);
        let intent = analysis.intent;
        let mut plan = QueryPlan::new(query, analysis);

        match intent {
            QueryIntent::Calculation => self.plan_calculation(&mut plan, query)?,
            QueryIntent::Synthesis | QueryIntent::Comparison => {
                self.plan_multi_part(&mut plan, query)?
            }
            QueryIntent::CurrentEvents => self.plan_current_events(&mut plan, query)?,
            QueryIntent::Retrieval => {
                let confidence = plan.intent_analysis.confidence;
                plan.add_step(
                    "Retrieve relevant passages",
                    query,
                    self.vector_selection(query, confidence, "retrieval intent"),
                    vec![],
                )?;
            }
        }

        info!(
            intent = %intent,
            steps = plan.len(),
            "Created query plan"
        );
        for step in plan.steps() {
            debug!(
                step = step.step_number,
                tool = %step.tool_selection.tool_name,
                sub_query = %step.sub_query,
                depends_on = step.depends_on.len(),
                "Planned step"
            );
        }

        Ok(plan)
    }
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Split a multi-part query on `and`, `vs`, `versus`, `compared to` and `;`.
///
/// Clauses keep their original casing; lead words such as "compare" are
/// dropped and blank clauses discarded.
pub fn split_clauses(query: &str) -> Vec<String> {
    let mut clauses: Vec<Vec<&str>> = vec![Vec::new()];
    let words: Vec<&str> = query.split_whitespace().collect();
    let mut i = 0;

    while i < words.len() {
        let raw = words[i];
        let bare = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();

        let is_separator = CLAUSE_SEPARATORS.contains(&bare.as_str())
            || (bare == "compared"
                && words
                    .get(i + 1)
                    .is_some_and(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == "to"));

        if is_separator {
            clauses.push(Vec::new());
            i += if bare == "compared" { 2 } else { 1 };
            continue;
        }

        if let Some(current) = clauses.last_mut() {
            current.push(raw.trim_end_matches(';'));
        }
        if raw.ends_with(';') {
            clauses.push(Vec::new());
        }
        i += 1;
    }

    clauses
        .into_iter()
        .map(|words| {
            let skip = words
                .iter()
                .take_while(|w| CLAUSE_LEAD_WORDS.contains(&w.to_lowercase().as_str()))
                .count();
            words[skip..]
                .join(" ")
                .trim_matches(|c: char| !c.is_alphanumeric() && c != ')' && c != '"')
                .to_string()
        })
        .filter(|clause| !clause.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rag_types::StepStatus;

    fn planner() -> QueryPlanner {
        QueryPlanner::default()
    }

    fn tools(plan: &QueryPlan) -> Vec<&str> {
        plan.steps()
            .iter()
            .map(|s| s.tool_selection.tool_name.as_str())
            .collect()
    }

    #[test]
    fn test_retrieval_plan() {
        let plan = planner().create_plan("What is machine learning?").unwrap();
        assert_eq!(plan.intent_analysis.intent, QueryIntent::Retrieval);
        assert_eq!(tools(&plan), vec!["vector_search"]);

        let step = &plan.steps()[0];
        assert_eq!(step.status, StepStatus::Pending);
        assert_eq!(step.tool_selection.parameters["query"], "What is machine learning?");
        assert_eq!(step.tool_selection.parameters["top_k"], 5);
    }

    #[test]
    fn test_empty_query_rejected() {
        assert_eq!(planner().create_plan("   ").unwrap_err(), PlanError::EmptyQuery);
    }

    #[test]
    fn test_calculation_plan() {
        let plan = planner().create_plan("What is 15% of 200?").unwrap();
        assert_eq!(tools(&plan), vec!["calculator"]);
        assert_eq!(
            plan.steps()[0].tool_selection.parameters["expression"],
            "(15/100)*200"
        );
    }

    #[test]
    fn test_calculation_with_subject_adds_retrieval() {
        let plan = planner()
            .create_plan("Calculate 12 * 4 for the marketing budget")
            .unwrap();
        assert_eq!(tools(&plan), vec!["calculator", "vector_search"]);
        assert_eq!(plan.steps()[1].sub_query, "marketing budget");
        assert!(plan.get_ready_steps().len() == 2);
    }

    #[test]
    fn test_calculation_without_expression_falls_back_to_search() {
        let plan = planner()
            .create_plan("Calculate the percentage of churned users")
            .unwrap();
        assert_eq!(plan.intent_analysis.intent, QueryIntent::Calculation);
        assert_eq!(tools(&plan), vec!["vector_search"]);
    }

    #[test]
    fn test_comparison_plan_has_final_dependent_step() {
        let plan = planner()
            .create_plan("Compare BM25 vs dense retrieval")
            .unwrap();
        assert_eq!(plan.intent_analysis.intent, QueryIntent::Comparison);
        assert_eq!(plan.len(), 3);

        let sub_queries: Vec<&str> = plan.steps().iter().map(|s| s.sub_query.as_str()).collect();
        assert_eq!(
            sub_queries,
            vec!["BM25", "dense retrieval", "Compare BM25 vs dense retrieval"]
        );
        assert_eq!(plan.steps()[2].depends_on, vec![StepId(0), StepId(1)]);
        assert_eq!(plan.get_ready_steps(), vec![StepId(0), StepId(1)]);
    }

    #[test]
    fn test_clause_count_capped_by_max_steps() {
        let planner = QueryPlanner::new(PlannerConfig {
            max_steps: 3,
            ..Default::default()
        });
        let plan = planner
            .create_plan("Summarize onboarding and billing and support and security")
            .unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.steps()[0].sub_query, "onboarding");
        assert_eq!(plan.steps()[1].sub_query, "billing");
    }

    #[test]
    fn test_current_events_plan() {
        let plan = planner().create_plan("Latest news on mortgage rates").unwrap();
        assert_eq!(tools(&plan), vec!["web_search", "vector_search"]);
        assert!(plan.steps().iter().all(|s| s.depends_on.is_empty()));

        let no_web = QueryPlanner::new(PlannerConfig {
            enable_web_search: false,
            ..Default::default()
        });
        let plan = no_web.create_plan("Latest news on mortgage rates").unwrap();
        assert_eq!(tools(&plan), vec!["vector_search"]);
    }

    #[test]
    fn test_split_clauses() {
        assert_eq!(
            split_clauses("Compare Rust compared to Go; then Zig"),
            vec!["Rust", "Go", "then Zig"]
        );
        assert_eq!(split_clauses("machine learning"), vec!["machine learning"]);
    }
}
