//! Configuration loading for the agentic RAG pipeline.
//!
//! Layered config: defaults -> config file -> CLI config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/agentic-rag/config.toml.
//! Environment variables use the `AGENTIC_RAG` prefix and `__` for nesting,
//! e.g. `AGENTIC_RAG_REFLECTION__QUALITY_THRESHOLD=0.8`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::quality::QualityDimension;

/// How ready plan steps are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One tool call at a time, in step order.
    #[default]
    Sequential,

    /// All ready steps of a batch dispatched together.
    Concurrent,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Concurrent => "concurrent",
        }
    }
}

/// Orchestrator loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run the reflect/correct loop after the first synthesis
    pub enable_reflection: bool,

    /// Corrective tool calls issued per reflection iteration
    pub max_corrections_per_iteration: usize,

    pub execution_mode: ExecutionMode,

    /// Refinement stops once this much wall-clock time has elapsed
    pub max_total_time_ms: u64,

    /// Prepend conversation memory context to the query before planning
    pub inject_memory_context: bool,

    /// Cap on distinct text fragments in a synthesized answer
    pub max_answer_parts: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_reflection: true,
            max_corrections_per_iteration: 2,
            execution_mode: ExecutionMode::Sequential,
            max_total_time_ms: 30_000,
            inject_memory_context: true,
            max_answer_parts: 12,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_total_time_ms == 0 {
            return Err(ConfigError::invalid(
                "pipeline.max_total_time_ms",
                "must be > 0",
            ));
        }
        if self.max_answer_parts == 0 {
            return Err(ConfigError::invalid(
                "pipeline.max_answer_parts",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

/// Query planner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Upper bound on steps in one plan
    pub max_steps: usize,

    /// Route time-sensitive queries to web_search
    pub enable_web_search: bool,

    /// top_k passed to vector_search steps
    pub default_top_k: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_steps: 5,
            enable_web_search: true,
            default_top_k: 5,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps < 2 {
            return Err(ConfigError::invalid("planner.max_steps", "must be >= 2"));
        }
        if self.default_top_k == 0 {
            return Err(ConfigError::invalid("planner.default_top_k", "must be > 0"));
        }
        Ok(())
    }
}

/// Confidence scorer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub source_reliability_weight: f64,
    pub result_diversity_weight: f64,
    pub completeness_weight: f64,
    pub tool_success_rate_weight: f64,

    /// Confidence lost per refinement iteration beyond the first
    pub iteration_penalty: f64,

    /// Floor for the iteration multiplier
    pub min_iteration_multiplier: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            source_reliability_weight: 0.3,
            result_diversity_weight: 0.2,
            completeness_weight: 0.2,
            tool_success_rate_weight: 0.3,
            iteration_penalty: 0.05,
            min_iteration_multiplier: 0.5,
        }
    }
}

impl ScorerConfig {
    pub fn weight_sum(&self) -> f64 {
        self.source_reliability_weight
            + self.result_diversity_weight
            + self.completeness_weight
            + self.tool_success_rate_weight
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if (self.weight_sum() - 1.0).abs() >= 0.01 {
            return Err(ConfigError::invalid(
                "scorer",
                format!("factor weights must sum to 1.0, got {:.3}", self.weight_sum()),
            ));
        }
        if !(0.0..=1.0).contains(&self.iteration_penalty) {
            return Err(ConfigError::invalid(
                "scorer.iteration_penalty",
                "must be 0.0-1.0",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_iteration_multiplier) {
            return Err(ConfigError::invalid(
                "scorer.min_iteration_multiplier",
                "must be 0.0-1.0",
            ));
        }
        Ok(())
    }
}

/// Weights for the seven quality dimensions.
///
/// Always normalized: construction and deserialization rescale the weights
/// so they sum to 1.0. Every dimension must be present and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<QualityDimension, f64>",
    into = "BTreeMap<QualityDimension, f64>"
)]
pub struct DimensionWeights(BTreeMap<QualityDimension, f64>);

impl DimensionWeights {
    /// Build from raw weights, normalizing to a unit sum.
    pub fn new(raw: BTreeMap<QualityDimension, f64>) -> Result<Self, ConfigError> {
        for dimension in QualityDimension::ALL {
            match raw.get(&dimension) {
                None => {
                    return Err(ConfigError::invalid(
                        "reflection.dimension_weights",
                        format!("missing weight for {}", dimension),
                    ))
                }
                Some(w) if !w.is_finite() || *w < 0.0 => {
                    return Err(ConfigError::invalid(
                        "reflection.dimension_weights",
                        format!("weight for {} must be a non-negative number", dimension),
                    ))
                }
                Some(_) => {}
            }
        }

        let total: f64 = raw.values().sum();
        if total <= 0.0 {
            return Err(ConfigError::invalid(
                "reflection.dimension_weights",
                "weights must have a positive total",
            ));
        }

        Ok(Self(raw.into_iter().map(|(d, w)| (d, w / total)).collect()))
    }

    pub fn get(&self, dimension: QualityDimension) -> f64 {
        self.0.get(&dimension).copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QualityDimension, f64)> + '_ {
        self.0.iter().map(|(d, w)| (*d, *w))
    }
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (QualityDimension::Completeness, 0.20),
            (QualityDimension::Accuracy, 0.20),
            (QualityDimension::Relevance, 0.20),
            (QualityDimension::Coherence, 0.10),
            (QualityDimension::CitationSupport, 0.10),
            (QualityDimension::Specificity, 0.10),
            (QualityDimension::Conciseness, 0.10),
        ]))
    }
}

impl TryFrom<BTreeMap<QualityDimension, f64>> for DimensionWeights {
    type Error = ConfigError;

    fn try_from(raw: BTreeMap<QualityDimension, f64>) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<DimensionWeights> for BTreeMap<QualityDimension, f64> {
    fn from(weights: DimensionWeights) -> Self {
        weights.0
    }
}

/// Reflection engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionConfig {
    /// Answers scoring at or above this are acceptable
    pub quality_threshold: f64,

    /// Iteration count at which refinement always stops
    pub max_iterations: u32,

    pub enable_self_correction: bool,

    /// Confidence at or above this ends refinement regardless of quality
    pub high_confidence_threshold: f64,

    /// Dimensions scoring below this produce recommendations
    pub dimension_threshold: f64,

    pub dimension_weights: DimensionWeights,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            quality_threshold: 0.7,
            max_iterations: 3,
            enable_self_correction: true,
            high_confidence_threshold: 0.9,
            dimension_threshold: 0.6,
            dimension_weights: DimensionWeights::default(),
        }
    }
}

impl ReflectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("reflection.quality_threshold", self.quality_threshold),
            (
                "reflection.high_confidence_threshold",
                self.high_confidence_threshold,
            ),
            ("reflection.dimension_threshold", self.dimension_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be 0.0-1.0, got {}", value),
                ));
            }
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid(
                "reflection.max_iterations",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

/// Live web search backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    /// Search endpoint; web_search is unavailable when unset
    pub endpoint: Option<String>,

    /// API key (usually supplied via AGENTIC_RAG_TOOLS__WEB_SEARCH__API_KEY)
    pub api_key: Option<String>,

    pub max_results: usize,
    pub max_retries: u32,
    pub request_timeout_ms: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            max_results: 5,
            max_retries: 3,
            request_timeout_ms: 8_000,
        }
    }
}

/// Tool registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Per-invocation deadline; a timed-out call yields a failed result
    pub timeout_ms: u64,

    pub web_search: WebSearchConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            web_search: WebSearchConfig::default(),
        }
    }
}

impl ToolsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid("tools.timeout_ms", "must be > 0"));
        }
        if self.web_search.max_results == 0 {
            return Err(ConfigError::invalid(
                "tools.web_search.max_results",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

/// Conversation memory budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Token budget for the short-term message window
    pub max_tokens: usize,

    /// Token budget for the running summary of evicted messages
    pub summary_tokens: usize,

    /// Most recent user questions folded into the planning query; 0
    /// disables the fold
    pub context_turns: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2_000,
            summary_tokens: 500,
            context_turns: 3,
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tokens == 0 {
            return Err(ConfigError::invalid("memory.max_tokens", "must be > 0"));
        }
        if self.summary_tokens == 0 {
            return Err(ConfigError::invalid("memory.summary_tokens", "must be > 0"));
        }
        Ok(())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub scorer: ScorerConfig,

    #[serde(default)]
    pub reflection: ReflectionConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub memory: MemoryConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            pipeline: PipelineConfig::default(),
            planner: PlannerConfig::default(),
            scorer: ScorerConfig::default(),
            reflection: ReflectionConfig::default(),
            tools: ToolsConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/agentic-rag/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (AGENTIC_RAG_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .add_source(File::with_name(&default_config_path().to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("AGENTIC_RAG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.planner.validate()?;
        self.scorer.validate()?;
        self.reflection.validate()?;
        self.tools.validate()?;
        self.memory.validate()?;
        Ok(())
    }
}

/// Location of the default config file (extension resolved by `config`).
pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", "agentic-rag")
        .map(|p| p.config_dir().join("config"))
        .unwrap_or_else(|| PathBuf::from("./config"))
}
