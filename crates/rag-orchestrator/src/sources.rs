//! Citation collection from retrieval results.

use serde_json::Value;

use rag_types::{SourceRecord, ToolResult, WEB_SEARCH};

/// Deduplicated citations from every successful retrieval result, in
/// first-seen order. A repeated record keeps its best score.
pub fn collect_sources(results: &[ToolResult]) -> Vec<SourceRecord> {
    let mut sources: Vec<SourceRecord> = Vec::new();

    for result in results.iter().filter(|r| r.success && r.is_retrieval()) {
        for item in result.result_items() {
            let Some(record) = source_record(&result.tool_name, item) else {
                continue;
            };
            match sources.iter_mut().find(|s| s.key() == record.key()) {
                Some(existing) => existing.score = existing.score.max(record.score),
                None => sources.push(record),
            }
        }
    }

    sources
}

fn source_record(tool_name: &str, item: &Value) -> Option<SourceRecord> {
    let str_field = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_string);
    let u64_field = |key: &str| item.get(key).and_then(Value::as_u64);

    let document_id = str_field("document_id").or_else(|| str_field("url"))?;
    let source = str_field("source").unwrap_or_else(|| {
        if tool_name == WEB_SEARCH {
            "web".to_string()
        } else {
            tool_name.to_string()
        }
    });

    Some(SourceRecord {
        document_id,
        chunk_id: str_field("chunk_id"),
        start_offset: u64_field("start_offset"),
        end_offset: u64_field("end_offset"),
        page_number: u64_field("page_number").and_then(|p| u32::try_from(p).ok()),
        source,
        score: item.get("score").and_then(Value::as_f64).unwrap_or(0.0),
    })
}
