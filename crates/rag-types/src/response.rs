//! Response returned by the pipeline.

use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceScore;
use crate::quality::AnswerQualityAssessment;
use crate::trace::ExecutionTrace;

/// Citation metadata for retrieval-derived content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Document identifier (URL for web results)
    pub document_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,

    /// Origin label (file name, collection, or "web")
    pub source: String,

    /// Best retrieval score seen for this record
    #[serde(default)]
    pub score: f64,
}

impl SourceRecord {
    /// Identity used for deduplication.
    pub fn key(&self) -> (&str, Option<&str>) {
        (self.document_id.as_str(), self.chunk_id.as_deref())
    }
}

/// Final answer with confidence, citations and trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgenticRagResponse {
    pub answer: String,
    pub confidence: ConfidenceScore,
    pub sources: Vec<SourceRecord>,
    pub trace: ExecutionTrace,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<AnswerQualityAssessment>,
}

impl AgenticRagResponse {
    /// Convert to markdown format for terminal output.
    pub fn to_markdown(&self) -> String {
        let mut lines = Vec::new();

        lines.push("## Answer".to_string());
        lines.push(String::new());
        lines.push(self.answer.clone());
        lines.push(String::new());
        lines.push(format!("- **Confidence:** {:.2}", self.confidence.overall));

        if let Some(quality) = &self.quality {
            lines.push(format!("- **Quality:** {:.2}", quality.overall_score));
            let (dimension, score) = quality.get_lowest_dimension();
            lines.push(format!("- **Weakest dimension:** {} ({:.2})", dimension, score));
        }

        if !self.sources.is_empty() {
            lines.push(String::new());
            lines.push("### Sources".to_string());
            for (i, source) in self.sources.iter().enumerate() {
                let mut line = format!("{}. {}", i + 1, source.document_id);
                if let Some(chunk) = &source.chunk_id {
                    line.push_str(&format!(" [{}]", chunk));
                }
                if let Some(page) = source.page_number {
                    line.push_str(&format!(" p.{}", page));
                }
                line.push_str(&format!(" ({})", source.source));
                lines.push(line);
            }
        }

        if !self.trace.warnings.is_empty() {
            lines.push(String::new());
            lines.push("### Warnings".to_string());
            for warning in &self.trace.warnings {
                lines.push(format!("- {}", warning));
            }
        }

        lines.push(String::new());
        lines.push(format!("*{}*", self.trace.to_summary()));

        lines.join("\n")
    }
}
