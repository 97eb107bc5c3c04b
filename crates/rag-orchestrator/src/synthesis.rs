//! Extractive answer synthesis.
//!
//! The answer is assembled from the textual evidence of successful tool
//! results: retrieval hits contribute their `content` (or a web hit's
//! `snippet`), calculator results contribute a formatted line. Fragments are
//! deduplicated in first-seen order and capped.

use std::collections::HashSet;

use serde_json::Value;

use rag_types::{ToolResult, CALCULATOR};

/// Answer when no tool produced a usable result.
pub const NO_INFORMATION_ANSWER: &str = "No information available for this query.";

/// Answer when tools ran but returned no relevant text.
pub const NO_RELEVANT_ANSWER: &str = "I could not find relevant information for this query.";

/// Text fragments carried by one result, in payload order.
pub fn extract_parts(result: &ToolResult) -> Vec<String> {
    if !result.success {
        return Vec::new();
    }

    if result.tool_name == CALCULATOR {
        let formatted = match result.data.get("formatted") {
            Some(Value::String(s)) => Some(s.clone()),
            _ => result.data.get("result").map(Value::to_string),
        };
        return formatted
            .map(|value| match result.data.get("expression").and_then(Value::as_str) {
                Some(expression) => format!("Calculation result: {} = {}", expression, value),
                None => format!("Calculation result: {}", value),
            })
            .into_iter()
            .collect();
    }

    result
        .result_items()
        .iter()
        .filter_map(|item| {
            ["content", "snippet", "title"]
                .into_iter()
                .filter_map(|key| item.get(key).and_then(Value::as_str))
                .map(str::trim)
                .find(|text| !text.is_empty())
        })
        .map(str::to_string)
        .collect()
}

/// Build an answer from everything gathered so far.
pub fn synthesize(results: &[ToolResult], max_parts: usize) -> String {
    if !results.iter().any(|r| r.success) {
        return NO_INFORMATION_ANSWER.to_string();
    }

    let mut seen: HashSet<String> = HashSet::new();
    let parts: Vec<String> = results
        .iter()
        .flat_map(extract_parts)
        .filter(|part| seen.insert(part.to_lowercase()))
        .take(max_parts.max(1))
        .collect();

    if parts.is_empty() {
        NO_RELEVANT_ANSWER.to_string()
    } else {
        parts.join("\n\n")
    }
}
