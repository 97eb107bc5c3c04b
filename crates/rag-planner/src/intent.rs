//! Intent classification for queries.
//!
//! The `IntentClassifier` scores query text against keyword lists for each
//! non-default intent and extracts the entities and keywords that later
//! drive gap detection. Arithmetic phrasing is recognized separately by
//! [`extract_expression`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use rag_types::{IntentAnalysis, QueryIntent};

/// Configuration for intent classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Keywords that indicate Calculation intent
    pub calculation_keywords: Vec<String>,

    /// Keywords that indicate Comparison intent
    pub comparison_keywords: Vec<String>,

    /// Keywords that indicate CurrentEvents intent
    pub current_events_keywords: Vec<String>,

    /// Keywords that indicate Synthesis intent
    pub synthesis_keywords: Vec<String>,

    /// Words never reported as keywords
    pub stopwords: Vec<String>,

    /// Intent when no keyword matches
    pub default_intent: QueryIntent,

    /// Confidence reported for the default intent
    pub default_confidence: f64,
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            calculation_keywords: strings(&[
                "calculate",
                "compute",
                "percent",
                "percentage",
                "sum of",
                "product of",
                "how much is",
                "multiplied by",
                "divided by",
                "square root",
            ]),
            comparison_keywords: strings(&[
                "compare",
                "comparison",
                "vs",
                "versus",
                "difference between",
                "differences between",
                "compared to",
                "better than",
            ]),
            current_events_keywords: strings(&[
                "latest",
                "current",
                "currently",
                "today",
                "news",
                "recent",
                "recently",
                "this week",
                "right now",
            ]),
            synthesis_keywords: strings(&[
                "summarize",
                "summary",
                "overview",
                "explain how",
                "relationship between",
                "combine",
                "and",
            ]),
            stopwords: strings(&[
                "the", "and", "for", "are", "was", "were", "what", "which", "who", "whom",
                "when", "where", "why", "how", "does", "did", "can", "could", "should", "would",
                "will", "with", "from", "into", "about", "this", "that", "these", "those",
                "there", "their", "they", "them", "then", "than", "have", "has", "had", "been",
                "being", "our", "your", "you", "its", "not", "but", "all", "any", "some", "tell",
                "give", "show", "please", "between", "also", "more", "most", "much", "many",
            ]),
            default_intent: QueryIntent::Retrieval,
            default_confidence: 0.5,
        }
    }
}

/// Intent classifier using keyword heuristics.
pub struct IntentClassifier {
    config: ClassifierConfig,
    stopwords: HashSet<String>,
}

impl IntentClassifier {
    /// Create a new classifier with default configuration.
    pub fn new() -> Self {
        Self::with_config(ClassifierConfig::default())
    }

    /// Create a classifier with custom configuration.
    pub fn with_config(config: ClassifierConfig) -> Self {
        let stopwords = config.stopwords.iter().map(|s| s.to_lowercase()).collect();
        Self { config, stopwords }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify the intent of a query and extract entities and keywords.
    pub fn classify(&self, query: &str) -> IntentAnalysis {
        let normalized = normalize_for_matching(query);
        let has_expression = extract_expression(query).is_some();

        let expression_bonus = if has_expression { 2 } else { 0 };
        let calculation_score =
            count_matches(&normalized, &self.config.calculation_keywords) + expression_bonus;
        let comparison_score = count_matches(&normalized, &self.config.comparison_keywords);
        let current_score = count_matches(&normalized, &self.config.current_events_keywords);
        let synthesis_score = count_matches(&normalized, &self.config.synthesis_keywords);

        debug!(
            query = query,
            calculation_score,
            comparison_score,
            current_score,
            synthesis_score,
            "Intent classification scores"
        );

        // Ties resolve in this order.
        let ranked = [
            (QueryIntent::Calculation, calculation_score),
            (QueryIntent::Comparison, comparison_score),
            (QueryIntent::CurrentEvents, current_score),
            (QueryIntent::Synthesis, synthesis_score),
        ];
        let best = ranked
            .iter()
            .fold(None::<(QueryIntent, usize)>, |best, &(intent, score)| match best {
                Some((_, top)) if top >= score => best,
                _ if score > 0 => Some((intent, score)),
                _ => best,
            });

        let (intent, confidence) = match best {
            Some((intent, score)) => (intent, (0.55 + 0.15 * score as f64).min(0.95)),
            None => (self.config.default_intent, self.config.default_confidence),
        };

        IntentAnalysis {
            intent,
            confidence,
            entities: extract_entities(query),
            keywords: self.extract_keywords(query),
        }
    }

    /// Lowercase content words of at least three characters, deduplicated,
    /// in query order. Pure numbers are skipped.
    pub fn extract_keywords(&self, query: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        query
            .split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .filter(|w| w.chars().count() >= 3)
            .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
            .filter(|w| !self.stopwords.contains(w))
            .filter(|w| seen.insert(w.clone()))
            .collect()
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase, punctuation replaced by spaces, padded so that
/// `" phrase "` matches whole words only.
fn normalize_for_matching(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    format!(" {} ", cleaned.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn count_matches(normalized: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .filter(|k| normalized.contains(&format!(" {} ", k.to_lowercase())))
        .count()
}

/// Double-quoted phrases, then runs of capitalized words that do not start
/// a sentence. Deduplicated, in query order within each group.
pub fn extract_entities(query: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();
    let push = |entity: String, entities: &mut Vec<String>| {
        if !entity.is_empty() && !entities.contains(&entity) {
            entities.push(entity);
        }
    };

    let mut unquoted = String::new();
    for (i, segment) in query.split('"').enumerate() {
        if i % 2 == 1 {
            push(segment.trim().to_string(), &mut entities);
            unquoted.push(' ');
        } else {
            unquoted.push_str(segment);
        }
    }

    let mut run: Vec<&str> = Vec::new();
    let mut sentence_start = true;
    for raw in unquoted.split_whitespace() {
        let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
        let capitalized = word.chars().count() >= 2
            && word.chars().next().is_some_and(char::is_uppercase);

        if capitalized && !sentence_start {
            run.push(word);
        } else if !run.is_empty() {
            push(run.join(" "), &mut entities);
            run.clear();
        }

        // A punctuation break also ends a run.
        if raw.ends_with([',', ';', ':', '?', '!', '.']) && !run.is_empty() {
            push(run.join(" "), &mut entities);
            run.clear();
        }
        sentence_start = raw.ends_with(['.', '?', '!']);
    }
    if !run.is_empty() {
        push(run.join(" "), &mut entities);
    }

    entities
}

/// Find an arithmetic expression in natural-language text.
///
/// Operator words become symbols, `X% of Y` becomes `(X/100)*Y`, and the
/// longest run of arithmetic characters containing both a digit and an
/// operator is returned.
pub fn extract_expression(query: &str) -> Option<String> {
    let normalized = rewrite_arithmetic_words(query);

    normalized
        .split(|c: char| !is_expression_char(c))
        .map(|run| {
            run.trim_start_matches(|c: char| {
                c.is_whitespace() || matches!(c, '+' | '*' | '/' | '%' | '^' | ',' | '.')
            })
            .trim_end_matches(|c: char| {
                c.is_whitespace() || matches!(c, '+' | '-' | '*' | '/' | '%' | '^' | ',' | '.')
            })
        })
        .filter(|run| run.chars().any(|c| c.is_ascii_digit()))
        .filter(|run| has_binary_operator(run))
        .filter(|run| parens_balanced(run))
        .max_by_key(|run| run.len())
        .map(|run| run.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn is_expression_char(c: char) -> bool {
    c.is_ascii_digit()
        || c == ' '
        || matches!(c, '.' | ',' | '+' | '-' | '*' | '/' | '%' | '^' | '(' | ')')
}

/// An operator with an operand on both sides (ignoring a leading minus).
fn has_binary_operator(run: &str) -> bool {
    let body = run.trim_start_matches(['-', ' ', '(']);
    body.char_indices().any(|(i, c)| {
        matches!(c, '+' | '-' | '*' | '/' | '%' | '^')
            && body[..i].chars().any(|p| p.is_ascii_digit() || p == ')')
            && body[i + 1..].chars().any(|n| n.is_ascii_digit() || n == '(')
    })
}

fn parens_balanced(run: &str) -> bool {
    let mut depth: i32 = 0;
    for c in run.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn is_number(word: &str) -> bool {
    let digits = word.replace(',', "");
    !digits.is_empty() && digits.parse::<f64>().is_ok()
}

fn trim_word(word: &str) -> &str {
    word.trim_matches(|c: char| matches!(c, '?' | '!' | ',' | ';' | ':' | '.' | '"' | '\''))
}

fn rewrite_arithmetic_words(query: &str) -> String {
    let lower = query.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    let mut i = 0;

    while i < words.len() {
        let word = trim_word(words[i]);
        let next = words.get(i + 1).map(|w| trim_word(w));

        // "X% of Y" and "X percent of Y"
        let percent = if let Some(x) = word.strip_suffix('%').filter(|x| is_number(x)) {
            Some((x, 1))
        } else if is_number(word) && matches!(next, Some("percent")) {
            Some((word, 2))
        } else {
            None
        };
        if let Some((x, consumed)) = percent {
            let of = words.get(i + consumed).map(|w| trim_word(w));
            let y = words.get(i + consumed + 1).map(|w| trim_word(w));
            if let (Some("of"), Some(y)) = (of, y) {
                if is_number(y) {
                    out.push(format!("({}/100)*{}", x, y.replace(',', "")));
                    i += consumed + 2;
                    continue;
                }
            }
        }

        match (word, next) {
            ("multiplied", Some("by")) => {
                out.push("*".to_string());
                i += 2;
            }
            ("divided", Some("by")) => {
                out.push("/".to_string());
                i += 2;
            }
            _ => {
                let symbol = match word {
                    "plus" => "+",
                    "minus" => "-",
                    "times" => "*",
                    "over" => "/",
                    "mod" | "modulo" => "%",
                    _ => word,
                };
                out.push(symbol.to_string());
                i += 1;
            }
        }
    }

    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_retrieval() {
        let analysis = IntentClassifier::new().classify("What is machine learning?");
        assert_eq!(analysis.intent, QueryIntent::Retrieval);
        assert_eq!(analysis.confidence, 0.5);
        assert_eq!(analysis.keywords, vec!["machine", "learning"]);
        assert!(analysis.entities.is_empty());
    }

    #[test]
    fn test_calculation_from_expression() {
        let classifier = IntentClassifier::new();
        assert_eq!(
            classifier.classify("What is 15% of 200?").intent,
            QueryIntent::Calculation
        );
        assert_eq!(
            classifier.classify("Calculate 12 * (3 + 4)").intent,
            QueryIntent::Calculation
        );
    }

    #[test]
    fn test_comparison_beats_synthesis_on_tie() {
        let analysis = IntentClassifier::new().classify("Compare BM25 and dense retrieval");
        assert_eq!(analysis.intent, QueryIntent::Comparison);
    }

    #[test]
    fn test_current_events() {
        let analysis = IntentClassifier::new().classify("latest news on mortgage rates");
        assert_eq!(analysis.intent, QueryIntent::CurrentEvents);
        assert!(analysis.confidence > 0.5);
    }

    #[test]
    fn test_synthesis() {
        let analysis =
            IntentClassifier::new().classify("Summarize the onboarding process and billing rules");
        assert_eq!(analysis.intent, QueryIntent::Synthesis);
    }

    #[test]
    fn test_keyword_matching_is_whole_word() {
        // "understand" contains "and"; "versus" must not fire on "universe"
        let analysis = IntentClassifier::new().classify("understand the universe");
        assert_eq!(analysis.intent, QueryIntent::Retrieval);
    }

    #[test]
    fn test_extract_entities() {
        let entities =
            extract_entities("What is the housing market in Austin Texas? Ask \"Rate Watch\" too.");
        assert_eq!(entities, vec!["Rate Watch", "Austin Texas"]);

        assert!(extract_entities("Machine learning basics").is_empty());
    }

    #[test]
    fn test_keywords_dedup_and_skip_numbers() {
        let keywords = IntentClassifier::new()
            .extract_keywords("Budget 2024: budget growth and the growth of revenue");
        assert_eq!(keywords, vec!["budget", "growth", "revenue"]);
    }

    #[test]
    fn test_extract_expression() {
        assert_eq!(
            extract_expression("What is 15% of 200?").as_deref(),
            Some("(15/100)*200")
        );
        assert_eq!(
            extract_expression("what is 20 percent of 1,250").as_deref(),
            Some("(20/100)*1250")
        );
        assert_eq!(
            extract_expression("Calculate 12 * (3 + 4) please").as_deref(),
            Some("12 * (3 + 4)")
        );
        assert_eq!(
            extract_expression("what is 7 times 6?").as_deref(),
            Some("7 * 6")
        );
        assert_eq!(
            extract_expression("100 divided by 4").as_deref(),
            Some("100 / 4")
        );
    }

    #[test]
    fn test_no_expression_without_operator() {
        assert_eq!(extract_expression("What happened in 2024?"), None);
        assert_eq!(extract_expression("Tell me about 15%"), None);
        assert_eq!(extract_expression("What is machine learning?"), None);
    }
}
