//! Query intent types.

use serde::{Deserialize, Serialize};

/// Classified purpose of a query.
///
/// Drives tool selection in the planner and reliability weighting in the
/// confidence scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Look something up in the corpus.
    /// Examples: "What is machine learning?", "Where is the refund policy?"
    #[default]
    Retrieval,

    /// Combine several pieces of information into one answer.
    /// Examples: "Summarize onboarding and billing", "Explain how X and Y interact"
    Synthesis,

    /// Arithmetic over numbers present in the query.
    /// Examples: "What is 15% of 200?", "Calculate 12 * (3 + 4)"
    Calculation,

    /// Contrast two or more subjects.
    /// Examples: "Compare BM25 vs dense retrieval"
    Comparison,

    /// Time-sensitive question best served by live web search.
    /// Examples: "Latest mortgage rates today"
    CurrentEvents,
}

impl QueryIntent {
    /// Returns the display name for this intent.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::Retrieval => "retrieval",
            QueryIntent::Synthesis => "synthesis",
            QueryIntent::Calculation => "calculation",
            QueryIntent::Comparison => "comparison",
            QueryIntent::CurrentEvents => "current_events",
        }
    }

    /// Name of the tool best aligned with this intent.
    pub fn preferred_tool(&self) -> &'static str {
        match self {
            QueryIntent::Calculation => crate::tool::CALCULATOR,
            QueryIntent::CurrentEvents => crate::tool::WEB_SEARCH,
            QueryIntent::Retrieval | QueryIntent::Synthesis | QueryIntent::Comparison => {
                crate::tool::VECTOR_SEARCH
            }
        }
    }

    /// Whether the intent typically decomposes into several sub-queries.
    pub fn is_multi_part(&self) -> bool {
        matches!(self, QueryIntent::Synthesis | QueryIntent::Comparison)
    }
}

impl std::fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of intent classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IntentAnalysis {
    /// The classified intent
    pub intent: QueryIntent,

    /// Confidence score (0.0-1.0)
    pub confidence: f64,

    /// Named entities (capitalized terms, quoted phrases), in query order
    pub entities: Vec<String>,

    /// Content keywords (lowercase, stopwords removed), in query order
    pub keywords: Vec<String>,
}

impl IntentAnalysis {
    /// Entities followed by keywords not already covered by an entity.
    pub fn salient_terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = self.entities.clone();
        for keyword in &self.keywords {
            let covered = self
                .entities
                .iter()
                .any(|e| e.to_lowercase().split_whitespace().any(|w| w == keyword));
            if !covered {
                terms.push(keyword.clone());
            }
        }
        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_tool() {
        assert_eq!(QueryIntent::Calculation.preferred_tool(), "calculator");
        assert_eq!(QueryIntent::CurrentEvents.preferred_tool(), "web_search");
        assert_eq!(QueryIntent::Retrieval.preferred_tool(), "vector_search");
    }

    #[test]
    fn test_salient_terms_skip_keywords_inside_entities() {
        let analysis = IntentAnalysis {
            intent: QueryIntent::Retrieval,
            confidence: 0.5,
            entities: vec!["Austin Texas".to_string()],
            keywords: vec!["austin".to_string(), "housing".to_string()],
        };
        assert_eq!(
            analysis.salient_terms(),
            vec!["Austin Texas".to_string(), "housing".to_string()]
        );
    }

    #[test]
    fn test_intent_serde_snake_case() {
        let json = serde_json::to_string(&QueryIntent::CurrentEvents).unwrap();
        assert_eq!(json, "\"current_events\"");
    }
}
