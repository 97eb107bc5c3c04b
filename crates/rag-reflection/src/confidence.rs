//! Multi-factor confidence over accumulated tool results.
//!
//! Four factors, each in [0, 1]:
//! - `tool_success_rate`: successes / total
//! - `source_reliability`: per-tool reliability of the successful results,
//!   averaged over all results
//! - `result_diversity`: rewards several distinct tools over volume
//! - `completeness`: penalizes uncertainty phrases in the answer text
//!
//! The weighted sum is then discounted by the iteration count, so the same
//! evidence reached after more refinement rounds scores lower.

use std::collections::HashSet;

use tracing::debug;

use rag_types::{
    ConfidenceScore, QueryIntent, ScorerConfig, ToolResult, CALCULATOR, VECTOR_SEARCH, WEB_SEARCH,
};

use crate::markers::find_markers;

/// Completeness when no answer text is available to inspect.
pub const NEUTRAL_COMPLETENESS: f64 = 0.7;

/// Computes [`ConfidenceScore`]s.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    config: ScorerConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Score the evidence gathered so far.
    ///
    /// `iteration_count` is 1-based; 0 is treated as 1.
    pub fn calculate(
        &self,
        tool_results: &[ToolResult],
        intent: QueryIntent,
        iteration_count: u32,
        answer_text: Option<&str>,
    ) -> ConfidenceScore {
        if tool_results.is_empty() {
            return ConfidenceScore::zero();
        }

        let total = tool_results.len() as f64;
        let successes = tool_results.iter().filter(|r| r.success).count() as f64;

        let tool_success_rate = successes / total;
        let source_reliability = tool_results
            .iter()
            .filter(|r| r.success)
            .map(|r| tool_reliability(r, intent))
            .sum::<f64>()
            / total;
        let result_diversity = result_diversity(tool_results);
        let completeness = answer_text.map_or(NEUTRAL_COMPLETENESS, answer_completeness);

        let config = &self.config;
        let weight_sum = config.weight_sum();
        let weighted = if weight_sum > 0.0 {
            (config.source_reliability_weight * source_reliability
                + config.result_diversity_weight * result_diversity
                + config.completeness_weight * completeness
                + config.tool_success_rate_weight * tool_success_rate)
                / weight_sum
        } else {
            0.0
        };

        let multiplier = self.iteration_multiplier(iteration_count);
        let overall = (weighted * multiplier).clamp(0.0, 1.0);

        debug!(
            results = tool_results.len(),
            intent = %intent,
            iteration = iteration_count,
            tool_success_rate,
            source_reliability,
            result_diversity,
            completeness,
            overall,
            "Calculated confidence"
        );

        ConfidenceScore {
            overall,
            source_reliability: Some(source_reliability),
            result_diversity: Some(result_diversity),
            completeness: Some(completeness),
            tool_success_rate: Some(tool_success_rate),
        }
    }

    /// `max(1 - penalty * (iteration - 1), floor)`; never increases with
    /// the iteration count.
    pub fn iteration_multiplier(&self, iteration_count: u32) -> f64 {
        let extra_rounds = iteration_count.max(1) - 1;
        (1.0 - self.config.iteration_penalty * extra_rounds as f64)
            .max(self.config.min_iteration_multiplier)
            .min(1.0)
    }
}

/// Reliability of one successful result for the given intent.
pub fn tool_reliability(result: &ToolResult, intent: QueryIntent) -> f64 {
    let mut reliability: f64 = match result.tool_name.as_str() {
        CALCULATOR => 0.95,
        VECTOR_SEARCH => 0.85,
        WEB_SEARCH => 0.6,
        _ => 0.5,
    };

    if result.tool_name == intent.preferred_tool() {
        reliability += 0.1;
    }
    if intent == QueryIntent::Calculation && result.tool_name == WEB_SEARCH {
        reliability = reliability.min(0.5);
    }
    if result.is_empty_retrieval() {
        reliability *= 0.5;
    }

    reliability.min(1.0)
}

/// `0.5 * distinct/total + 0.5 * min(distinct, 3)/3` over tool names.
pub fn result_diversity(tool_results: &[ToolResult]) -> f64 {
    if tool_results.is_empty() {
        return 0.0;
    }
    let distinct = tool_results
        .iter()
        .map(|r| r.tool_name.as_str())
        .collect::<HashSet<_>>()
        .len() as f64;
    let total = tool_results.len() as f64;

    0.5 * (distinct / total) + 0.5 * (distinct.min(3.0) / 3.0)
}

/// `1 - 0.2` per distinct uncertainty marker, a further `0.2` off for
/// answers under 20 characters, floored at 0.
pub fn answer_completeness(answer: &str) -> f64 {
    let markers = find_markers(answer).len() as f64;
    let short_penalty = if answer.trim().chars().count() < 20 {
        0.2
    } else {
        0.0
    };
    (1.0 - 0.2 * markers - short_penalty).max(0.0)
}
