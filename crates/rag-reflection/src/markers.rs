//! Uncertainty phrases and text helpers shared by the scorer and the engine.

use serde_json::Value;

use rag_types::ToolResult;

/// Phrases that signal the answer is hedging or incomplete.
pub const UNCERTAINTY_MARKERS: &[&str] = &[
    "unknown",
    "not available",
    "incomplete",
    "unclear",
    "no information",
    "could not find",
    "insufficient",
    "not sure",
    "outdated",
];

/// Marker that flags stale rather than missing information.
pub const OUTDATED_MARKER: &str = "outdated";

/// Lowercase, non-alphanumerics collapsed to single spaces, padded with a
/// space on each side for whole-word `contains` checks.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    format!(" {} ", cleaned.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// True when `phrase` occurs in `normalized` as whole words.
pub fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    let needle = normalize(phrase);
    if needle.trim().is_empty() {
        return false;
    }
    normalized.contains(&needle)
}

/// Distinct uncertainty markers present in `text`, in list order.
pub fn find_markers(text: &str) -> Vec<&'static str> {
    let normalized = normalize(text);
    UNCERTAINTY_MARKERS
        .iter()
        .copied()
        .filter(|m| contains_phrase(&normalized, m))
        .collect()
}

/// Textual evidence carried by a successful result: retrieval `content`
/// and `snippet` fields, or a calculator's formatted result.
pub fn evidence_fragments(result: &ToolResult) -> Vec<String> {
    if !result.success {
        return Vec::new();
    }

    let mut fragments: Vec<String> = result
        .result_items()
        .iter()
        .flat_map(|item| {
            ["content", "snippet", "title"]
                .into_iter()
                .filter_map(|key| item.get(key).and_then(Value::as_str))
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();

    if let Some(value) = result.data.get("result") {
        match value {
            Value::Number(n) => fragments.push(n.to_string()),
            Value::String(s) => fragments.push(s.clone()),
            _ => {}
        }
    }
    if let Some(Value::String(formatted)) = result.data.get("formatted") {
        fragments.push(formatted.clone());
    }

    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_markers_whole_words() {
        assert_eq!(
            find_markers("The figure is unknown and the data is not available."),
            vec!["unknown", "not available"]
        );
        // "unknowns" and "sure" alone do not count
        assert!(find_markers("Known unknowns, for sure.").is_empty());
    }

    #[test]
    fn test_contains_phrase_ignores_blank_needle() {
        assert!(!contains_phrase(&normalize("anything"), "  "));
        assert!(contains_phrase(&normalize("Austin, Texas!"), "austin texas"));
    }

    #[test]
    fn test_evidence_fragments() {
        let retrieval = ToolResult::success(
            "vector_search",
            json!({"results": [{"content": "ML is AI."}, {"snippet": "Web text", "title": "T"}]})
                .as_object()
                .cloned()
                .unwrap(),
            1.0,
        );
        assert_eq!(
            evidence_fragments(&retrieval),
            vec!["ML is AI.", "Web text", "T"]
        );

        let calc = ToolResult::success(
            "calculator",
            json!({"expression": "6*7", "result": 42.0, "formatted": "42"})
                .as_object()
                .cloned()
                .unwrap(),
            1.0,
        );
        assert_eq!(evidence_fragments(&calc), vec!["42.0", "42"]);

        let failed = ToolResult::failure("vector_search", "down", 1.0);
        assert!(evidence_fragments(&failed).is_empty());
    }
}
