//! Answer quality assessment and correction strategy types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Dimension along which a synthesized answer is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityDimension {
    /// Does the answer cover everything the query asked about?
    Completeness,
    /// Is the answer grounded in the evidence the tools returned?
    Accuracy,
    /// Does the answer address the query's terms?
    Relevance,
    /// Is the answer free of repetition and run-on sentences?
    Coherence,
    /// Is retrieval-derived content backed by citable sources?
    CitationSupport,
    /// Does the answer contain concrete facts (numbers, named entities)?
    Specificity,
    /// Is the answer a reasonable length?
    Conciseness,
}

impl QualityDimension {
    pub const ALL: [QualityDimension; 7] = [
        QualityDimension::Completeness,
        QualityDimension::Accuracy,
        QualityDimension::Relevance,
        QualityDimension::Coherence,
        QualityDimension::CitationSupport,
        QualityDimension::Specificity,
        QualityDimension::Conciseness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityDimension::Completeness => "completeness",
            QualityDimension::Accuracy => "accuracy",
            QualityDimension::Relevance => "relevance",
            QualityDimension::Coherence => "coherence",
            QualityDimension::CitationSupport => "citation_support",
            QualityDimension::Specificity => "specificity",
            QualityDimension::Conciseness => "conciseness",
        }
    }
}

impl std::fmt::Display for QualityDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of shortfall a [`Gap`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    /// A query entity or keyword is absent from the answer
    MissingTerm,
    /// The answer contains an uncertainty marker
    Uncertainty,
    /// The answer flags its own information as stale
    Outdated,
}

/// A detected gap in an answer.
///
/// `detail` is the missing term or the matched marker, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gap {
    pub kind: GapKind,
    pub detail: String,
}

impl Gap {
    pub fn missing_term(term: impl Into<String>) -> Self {
        Self {
            kind: GapKind::MissingTerm,
            detail: term.into(),
        }
    }

    pub fn uncertainty(marker: impl Into<String>) -> Self {
        Self {
            kind: GapKind::Uncertainty,
            detail: marker.into(),
        }
    }

    pub fn outdated(marker: impl Into<String>) -> Self {
        Self {
            kind: GapKind::Outdated,
            detail: marker.into(),
        }
    }
}

impl std::fmt::Display for Gap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            GapKind::MissingTerm => write!(f, "Missing information about '{}'", self.detail),
            GapKind::Uncertainty => write!(f, "Uncertainty detected: '{}'", self.detail),
            GapKind::Outdated => write!(f, "Possibly outdated information: '{}'", self.detail),
        }
    }
}

/// Multi-dimensional quality score for a synthesized answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerQualityAssessment {
    /// Weighted combination of the dimension scores
    pub overall_score: f64,

    /// Score per dimension, in [0, 1]
    pub dimension_scores: BTreeMap<QualityDimension, f64>,

    /// Gaps detected in the answer, in detection order
    pub gaps: Vec<Gap>,

    /// Actionable guidance; empty means nothing to correct
    pub recommendations: Vec<String>,

    /// Reflection iteration that produced this assessment
    pub iteration: u32,
}

impl AnswerQualityAssessment {
    pub fn is_acceptable(&self, threshold: f64) -> bool {
        self.overall_score >= threshold
    }

    /// Lowest scoring dimension, `(Completeness, 0.0)` when nothing is recorded.
    pub fn get_lowest_dimension(&self) -> (QualityDimension, f64) {
        self.dimension_scores
            .iter()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(d, s)| (*d, *s))
            .unwrap_or((QualityDimension::Completeness, 0.0))
    }

    pub fn score(&self, dimension: QualityDimension) -> f64 {
        self.dimension_scores.get(&dimension).copied().unwrap_or(0.0)
    }

    /// Gap descriptions as plain strings.
    pub fn gap_descriptions(&self) -> Vec<String> {
        self.gaps.iter().map(ToString::to_string).collect()
    }
}

/// Remedial action proposed by reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionActionType {
    /// Broaden retrieval to pick up missing coverage
    ExpandSearch,
    /// Retrieve corroborating evidence
    VerifySources,
    /// Target a specific missing term
    FillGap,
    /// Re-run retrieval with a narrower query
    RefineQuery,
    /// Fetch fresher information from the web
    UpdateSearch,
}

impl CorrectionActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionActionType::ExpandSearch => "expand_search",
            CorrectionActionType::VerifySources => "verify_sources",
            CorrectionActionType::FillGap => "fill_gap",
            CorrectionActionType::RefineQuery => "refine_query",
            CorrectionActionType::UpdateSearch => "update_search",
        }
    }
}

impl std::fmt::Display for CorrectionActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed correction targeting a weak quality dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionStrategy {
    pub target_dimension: QualityDimension,
    pub description: String,
    pub action_type: CorrectionActionType,

    /// 1 (lowest) to 5 (highest)
    pub priority: u8,

    pub expected_improvement: f64,

    /// Term the corrective query should focus on, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_hint: Option<String>,
}

impl CorrectionStrategy {
    pub const DEFAULT_PRIORITY: u8 = 3;
    pub const DEFAULT_EXPECTED_IMPROVEMENT: f64 = 0.1;

    pub fn new(
        target_dimension: QualityDimension,
        action_type: CorrectionActionType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            target_dimension,
            description: description.into(),
            action_type,
            priority: Self::DEFAULT_PRIORITY,
            expected_improvement: Self::DEFAULT_EXPECTED_IMPROVEMENT,
            query_hint: None,
        }
    }

    /// Builder: set priority (clamped to 1-5)
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 5);
        self
    }

    pub fn with_expected_improvement(mut self, improvement: f64) -> Self {
        self.expected_improvement = improvement.clamp(0.0, 1.0);
        self
    }

    pub fn with_query_hint(mut self, hint: impl Into<String>) -> Self {
        self.query_hint = Some(hint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(scores: &[(QualityDimension, f64)]) -> AnswerQualityAssessment {
        AnswerQualityAssessment {
            overall_score: 0.5,
            dimension_scores: scores.iter().copied().collect(),
            gaps: vec![],
            recommendations: vec![],
            iteration: 1,
        }
    }

    #[test]
    fn test_lowest_dimension_defaults_to_completeness() {
        let empty = assessment(&[]);
        assert_eq!(
            empty.get_lowest_dimension(),
            (QualityDimension::Completeness, 0.0)
        );
    }

    #[test]
    fn test_lowest_dimension() {
        let a = assessment(&[
            (QualityDimension::Accuracy, 0.9),
            (QualityDimension::Relevance, 0.3),
            (QualityDimension::Coherence, 0.8),
        ]);
        assert_eq!(a.get_lowest_dimension(), (QualityDimension::Relevance, 0.3));
        assert!(a.is_acceptable(0.5));
        assert!(!a.is_acceptable(0.7));
    }

    #[test]
    fn test_strategy_defaults_and_clamp() {
        let s = CorrectionStrategy::new(
            QualityDimension::Completeness,
            CorrectionActionType::ExpandSearch,
            "broaden",
        );
        assert_eq!(s.priority, 3);
        assert!((s.expected_improvement - 0.1).abs() < f64::EPSILON);
        assert_eq!(s.clone().with_priority(9).priority, 5);
        assert_eq!(s.with_priority(0).priority, 1);
    }

    #[test]
    fn test_gap_display() {
        assert_eq!(
            Gap::missing_term("Austin").to_string(),
            "Missing information about 'Austin'"
        );
        assert_eq!(
            Gap::uncertainty("not available").to_string(),
            "Uncertainty detected: 'not available'"
        );
    }
}
