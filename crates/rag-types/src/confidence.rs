//! Process-level confidence over accumulated evidence.

use serde::{Deserialize, Serialize};

/// Named factor contributing to a [`ConfidenceScore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceFactor {
    SourceReliability,
    ResultDiversity,
    Completeness,
    ToolSuccessRate,
}

impl ConfidenceFactor {
    pub const ALL: [ConfidenceFactor; 4] = [
        ConfidenceFactor::SourceReliability,
        ConfidenceFactor::ResultDiversity,
        ConfidenceFactor::Completeness,
        ConfidenceFactor::ToolSuccessRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceFactor::SourceReliability => "source_reliability",
            ConfidenceFactor::ResultDiversity => "result_diversity",
            ConfidenceFactor::Completeness => "completeness",
            ConfidenceFactor::ToolSuccessRate => "tool_success_rate",
        }
    }
}

/// Confidence in the retrieval process, in [0, 1].
///
/// Factors are optional: a score built with [`ConfidenceScore::new`] has
/// only an overall value, and every missing factor reads as 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConfidenceScore {
    pub overall: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_reliability: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_diversity: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completeness: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_success_rate: Option<f64>,
}

impl ConfidenceScore {
    /// Score with an overall value only (clamped to [0, 1]).
    pub fn new(overall: f64) -> Self {
        Self {
            overall: overall.clamp(0.0, 1.0),
            ..Default::default()
        }
    }

    /// Zero confidence, used when no evidence exists at all.
    pub fn zero() -> Self {
        Self::new(0.0)
    }

    /// Value of a named factor, 0.0 when absent.
    pub fn factor(&self, factor: ConfidenceFactor) -> f64 {
        self.factor_opt(factor).unwrap_or(0.0)
    }

    fn factor_opt(&self, factor: ConfidenceFactor) -> Option<f64> {
        match factor {
            ConfidenceFactor::SourceReliability => self.source_reliability,
            ConfidenceFactor::ResultDiversity => self.result_diversity,
            ConfidenceFactor::Completeness => self.completeness,
            ConfidenceFactor::ToolSuccessRate => self.tool_success_rate,
        }
    }

    pub fn is_high_confidence(&self, threshold: f64) -> bool {
        self.overall >= threshold
    }

    /// Lowest factor among those present. `None` when no factor is set.
    pub fn get_weakest_factor(&self) -> Option<(ConfidenceFactor, f64)> {
        ConfidenceFactor::ALL
            .iter()
            .filter_map(|f| self.factor_opt(*f).map(|v| (*f, v)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}
