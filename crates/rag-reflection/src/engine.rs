//! Answer quality assessment and self-correction policy.
//!
//! The engine scores a synthesized answer along seven dimensions, lists the
//! gaps it can see (plan terms the answer never mentions, hedging phrases),
//! turns weak dimensions and gaps into ranked correction strategies, and
//! decides whether another refinement round is worth running.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use rag_planner::QueryPlan;
use rag_types::{
    AnswerQualityAssessment, ConfidenceScore, CorrectionActionType, CorrectionStrategy, Gap,
    GapKind, QualityDimension, ReflectionConfig, ToolResult, CALCULATOR,
};

use crate::markers::{contains_phrase, evidence_fragments, find_markers, normalize, OUTDATED_MARKER};

/// Word count above which conciseness starts to drop.
const CONCISE_WORDS: usize = 250;

/// Word count at which conciseness bottoms out.
const VERBOSE_WORDS: usize = 1000;

/// Scores answers and proposes corrections.
#[derive(Debug, Clone, Default)]
pub struct ReflectionEngine {
    config: ReflectionConfig,
}

impl ReflectionEngine {
    pub fn new(config: ReflectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReflectionConfig {
        &self.config
    }

    /// Score `answer` on every quality dimension.
    ///
    /// An empty answer scores zero everywhere. With no tool results there is
    /// nothing to verify against, so accuracy is zero.
    pub fn assess_quality(
        &self,
        answer: &str,
        query: &str,
        tool_results: &[ToolResult],
        plan: &QueryPlan,
        iteration_count: u32,
    ) -> AnswerQualityAssessment {
        let gaps = self.identify_gaps(answer, query, plan);

        let dimension_scores: BTreeMap<QualityDimension, f64> = if answer.trim().is_empty() {
            QualityDimension::ALL.iter().map(|d| (*d, 0.0)).collect()
        } else {
            let normalized = normalize(answer);
            QualityDimension::ALL
                .iter()
                .map(|d| {
                    let score = match d {
                        QualityDimension::Completeness => completeness(&normalized, plan),
                        QualityDimension::Accuracy => accuracy(&normalized, tool_results),
                        QualityDimension::Relevance => relevance(&normalized, plan),
                        QualityDimension::Coherence => coherence(answer),
                        QualityDimension::CitationSupport => citation_support(tool_results),
                        QualityDimension::Specificity => specificity(answer, plan),
                        QualityDimension::Conciseness => conciseness(answer),
                    };
                    (*d, score.clamp(0.0, 1.0))
                })
                .collect()
        };

        let overall_score = self
            .config
            .dimension_weights
            .iter()
            .map(|(d, w)| w * dimension_scores.get(&d).copied().unwrap_or(0.0))
            .sum::<f64>()
            .clamp(0.0, 1.0);

        let recommendations = self.recommendations(&dimension_scores, &gaps);

        debug!(
            iteration = iteration_count,
            overall_score,
            gaps = gaps.len(),
            recommendations = recommendations.len(),
            "Assessed answer quality"
        );

        AnswerQualityAssessment {
            overall_score,
            dimension_scores,
            gaps,
            recommendations,
            iteration: iteration_count,
        }
    }

    /// Plan terms absent from the answer, then hedging phrases found in it.
    pub fn identify_gaps(&self, answer: &str, query: &str, plan: &QueryPlan) -> Vec<Gap> {
        let normalized = normalize(answer);
        let mut gaps: Vec<Gap> = plan
            .intent_analysis
            .salient_terms()
            .into_iter()
            .filter(|term| !contains_phrase(&normalized, term))
            .map(Gap::missing_term)
            .collect();

        gaps.extend(find_markers(answer).into_iter().map(|marker| {
            if marker == OUTDATED_MARKER {
                Gap::outdated(marker)
            } else {
                Gap::uncertainty(marker)
            }
        }));

        debug!(query = query, gaps = gaps.len(), "Identified gaps");
        gaps
    }

    /// Ranked strategies for the weak dimensions and gaps of an assessment.
    ///
    /// Empty when the assessment carries no recommendations. Highest priority
    /// first with ties in generation order; only the first strategy per
    /// (action, hint) survives.
    pub fn generate_correction_strategies(
        &self,
        assessment: &AnswerQualityAssessment,
    ) -> Vec<CorrectionStrategy> {
        if assessment.recommendations.is_empty() {
            return Vec::new();
        }

        let threshold = self.config.dimension_threshold;
        let mut strategies: Vec<CorrectionStrategy> = Vec::new();

        for (dimension, score) in &assessment.dimension_scores {
            if *score >= threshold {
                continue;
            }
            let severe = *score < 0.3;
            let strategy = match dimension {
                QualityDimension::Completeness => CorrectionStrategy::new(
                    *dimension,
                    CorrectionActionType::ExpandSearch,
                    "Broaden retrieval to cover missing aspects",
                )
                .with_priority(if severe { 5 } else { 4 }),
                QualityDimension::Accuracy => CorrectionStrategy::new(
                    *dimension,
                    CorrectionActionType::VerifySources,
                    "Gather corroborating evidence",
                )
                .with_priority(if severe { 5 } else { 4 }),
                QualityDimension::Relevance => CorrectionStrategy::new(
                    *dimension,
                    CorrectionActionType::RefineQuery,
                    "Refocus retrieval on the query terms",
                )
                .with_priority(3),
                QualityDimension::CitationSupport => CorrectionStrategy::new(
                    *dimension,
                    CorrectionActionType::VerifySources,
                    "Find sources that can be cited",
                )
                .with_priority(2),
                QualityDimension::Specificity => CorrectionStrategy::new(
                    *dimension,
                    CorrectionActionType::FillGap,
                    "Retrieve concrete details",
                )
                .with_priority(2),
                QualityDimension::Coherence | QualityDimension::Conciseness => continue,
            };
            strategies.push(strategy.with_expected_improvement(threshold - score));
        }

        for gap in &assessment.gaps {
            let strategy = match gap.kind {
                GapKind::MissingTerm => CorrectionStrategy::new(
                    QualityDimension::Completeness,
                    CorrectionActionType::FillGap,
                    gap.to_string(),
                )
                .with_priority(4)
                .with_query_hint(gap.detail.clone()),
                GapKind::Uncertainty => CorrectionStrategy::new(
                    QualityDimension::Accuracy,
                    CorrectionActionType::RefineQuery,
                    gap.to_string(),
                )
                .with_priority(3),
                GapKind::Outdated => CorrectionStrategy::new(
                    QualityDimension::Accuracy,
                    CorrectionActionType::UpdateSearch,
                    gap.to_string(),
                )
                .with_priority(3),
            };
            strategies.push(strategy);
        }

        strategies.sort_by(|a, b| b.priority.cmp(&a.priority));
        let mut seen: HashSet<(CorrectionActionType, Option<String>)> = HashSet::new();
        strategies.retain(|s| seen.insert((s.action_type, s.query_hint.clone())));
        strategies
    }

    /// Whether another refinement round should run.
    pub fn should_iterate(
        &self,
        assessment: &AnswerQualityAssessment,
        iteration_count: u32,
        confidence: Option<&ConfidenceScore>,
    ) -> bool {
        let decision = if iteration_count >= self.config.max_iterations {
            (false, "max iterations reached")
        } else if !self.config.enable_self_correction {
            (false, "self-correction disabled")
        } else if assessment.recommendations.is_empty() {
            (false, "no recommendations")
        } else if confidence
            .is_some_and(|c| c.is_high_confidence(self.config.high_confidence_threshold))
        {
            (false, "confidence already high")
        } else if assessment.is_acceptable(self.config.quality_threshold) {
            (false, "quality acceptable")
        } else {
            (true, "quality below threshold")
        };

        debug!(
            iteration = iteration_count,
            overall_score = assessment.overall_score,
            iterate = decision.0,
            reason = decision.1,
            "Reflection decision"
        );
        decision.0
    }

    fn recommendations(
        &self,
        dimension_scores: &BTreeMap<QualityDimension, f64>,
        gaps: &[Gap],
    ) -> Vec<String> {
        let mut recommendations: Vec<String> = dimension_scores
            .iter()
            .filter(|(_, score)| **score < self.config.dimension_threshold)
            .map(|(dimension, score)| {
                let advice = match dimension {
                    QualityDimension::Completeness => "cover more aspects of the question",
                    QualityDimension::Accuracy => "ground claims in retrieved evidence",
                    QualityDimension::Relevance => "stay on the terms of the question",
                    QualityDimension::Coherence => "remove repeated or disjointed passages",
                    QualityDimension::CitationSupport => "draw on citable sources",
                    QualityDimension::Specificity => "add concrete details or figures",
                    QualityDimension::Conciseness => "shorten the answer",
                };
                format!("Improve {} ({:.2}): {}", dimension, score, advice)
            })
            .collect();

        recommendations.extend(gaps.iter().map(|gap| match gap.kind {
            GapKind::MissingTerm => format!("Find information about '{}'", gap.detail),
            GapKind::Uncertainty => format!("Resolve uncertainty ('{}')", gap.detail),
            GapKind::Outdated => "Search for more recent information".to_string(),
        }));
        recommendations
    }
}

/// Share of plan terms the answer mentions, less 0.15 per hedging phrase.
fn completeness(normalized_answer: &str, plan: &QueryPlan) -> f64 {
    let terms = plan.intent_analysis.salient_terms();
    let coverage = term_coverage(normalized_answer, &terms).unwrap_or(0.8);
    let markers = find_markers(normalized_answer).len() as f64;
    coverage - 0.15 * markers
}

/// Successful share of tool calls, scaled by how much of the answer's
/// vocabulary appears in the evidence.
fn accuracy(normalized_answer: &str, tool_results: &[ToolResult]) -> f64 {
    if tool_results.is_empty() {
        return 0.0;
    }
    let success_rate =
        tool_results.iter().filter(|r| r.success).count() as f64 / tool_results.len() as f64;

    let evidence: HashSet<String> = tool_results
        .iter()
        .flat_map(evidence_fragments)
        .flat_map(|fragment| content_words(&fragment))
        .collect();
    let answer_words = content_words(normalized_answer);
    let grounded = if answer_words.is_empty() {
        0.0
    } else {
        answer_words.iter().filter(|w| evidence.contains(*w)).count() as f64
            / answer_words.len() as f64
    };

    success_rate * (0.5 + 0.5 * grounded)
}

/// Share of query keywords the answer mentions.
fn relevance(normalized_answer: &str, plan: &QueryPlan) -> f64 {
    term_coverage(normalized_answer, &plan.intent_analysis.keywords).unwrap_or(1.0)
}

/// Penalizes repeated sentences; very short answers cap at 0.5.
fn coherence(answer: &str) -> f64 {
    let sentences: Vec<String> = answer
        .split(['.', '!', '?', '\n'])
        .map(|s| normalize(s).trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        return 0.0;
    }
    let distinct = sentences.iter().collect::<HashSet<_>>().len() as f64;
    let score = distinct / sentences.len() as f64;

    if answer.trim().chars().count() < 20 {
        score.min(0.5)
    } else {
        score
    }
}

/// Share of successful evidence items that carry a citable origin.
fn citation_support(tool_results: &[ToolResult]) -> f64 {
    let successful: Vec<&ToolResult> = tool_results.iter().filter(|r| r.success).collect();
    if successful.is_empty() {
        return 0.0;
    }

    let mut items = 0usize;
    let mut cited = 0usize;
    for result in &successful {
        if result.tool_name == CALCULATOR {
            items += 1;
            cited += 1;
            continue;
        }
        for item in result.result_items() {
            items += 1;
            if item.get("document_id").or_else(|| item.get("url")).is_some() {
                cited += 1;
            }
        }
    }

    if items == 0 {
        0.0
    } else {
        cited as f64 / items as f64
    }
}

/// Rewards figures, query entities and some length.
fn specificity(answer: &str, plan: &QueryPlan) -> f64 {
    let has_number = answer.chars().any(|c| c.is_ascii_digit());
    let words = answer.split_whitespace().count() as f64;
    let entities = &plan.intent_analysis.entities;
    let normalized = normalize(answer);
    let entity_coverage = term_coverage(&normalized, entities).unwrap_or(0.5);

    0.3 + if has_number { 0.2 } else { 0.0 } + 0.25 * (words / 40.0).min(1.0) + 0.25 * entity_coverage
}

/// 1.0 up to 250 words, falling linearly to 0.3 at 1000 words; answers under
/// five words score 0.6.
fn conciseness(answer: &str) -> f64 {
    let words = answer.split_whitespace().count();
    if words < 5 {
        0.6
    } else if words <= CONCISE_WORDS {
        1.0
    } else {
        let excess = (words - CONCISE_WORDS) as f64 / (VERBOSE_WORDS - CONCISE_WORDS) as f64;
        (1.0 - 0.7 * excess).max(0.3)
    }
}

fn term_coverage(normalized_answer: &str, terms: &[String]) -> Option<f64> {
    if terms.is_empty() {
        return None;
    }
    let present = terms
        .iter()
        .filter(|t| contains_phrase(normalized_answer, t))
        .count();
    Some(present as f64 / terms.len() as f64)
}

fn content_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 4)
        .map(str::to_lowercase)
        .collect()
}
