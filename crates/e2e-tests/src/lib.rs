//! End-to-end test infrastructure for the agentic RAG pipeline.
//!
//! Provides a shared TestHarness and helper functions for E2E tests
//! covering the full plan-execute-reflect-answer path over a corpus
//! loaded from disk.

use std::path::PathBuf;
use std::sync::Arc;

use rag_orchestrator::AgenticRag;
use rag_planner::{PlanError, Planner, QueryPlan, QueryPlanner};
use rag_tools::{Corpus, Document, StaticWebSearch, ToolRegistry, WebHit};
use rag_types::{PipelineConfig, PlannerConfig, ToolsConfig};

/// Shared test harness for E2E tests.
///
/// Writes a sample corpus to a temp directory and loads it the way the
/// CLI does.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Path of the corpus JSON file
    pub corpus_path: PathBuf,
    /// Corpus loaded from `corpus_path`
    pub corpus: Arc<Corpus>,
}

impl TestHarness {
    /// Create a new harness over [`sample_documents`].
    pub fn new() -> Self {
        Self::with_documents(sample_documents())
    }

    pub fn with_documents(documents: Vec<Document>) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let corpus_path = temp_dir.path().join("corpus.json");

        let bytes = serde_json::to_vec_pretty(&documents).expect("Failed to serialize corpus");
        std::fs::write(&corpus_path, bytes).expect("Failed to write corpus file");
        let corpus = Arc::new(Corpus::load_json(&corpus_path).expect("Failed to load corpus"));

        Self {
            _temp_dir: temp_dir,
            corpus_path,
            corpus,
        }
    }

    /// vector_search and calculator over the harness corpus.
    pub fn registry(&self) -> ToolRegistry {
        ToolRegistry::with_defaults(self.corpus.clone(), None, &ToolsConfig::default(), 5)
    }

    /// Default tools plus web_search answering with `hits`.
    pub fn registry_with_web(&self, hits: Vec<WebHit>) -> ToolRegistry {
        ToolRegistry::with_defaults(
            self.corpus.clone(),
            Some(Box::new(StaticWebSearch::new(hits))),
            &ToolsConfig::default(),
            5,
        )
    }

    /// Pipeline over [`Self::registry`] with the default planner.
    pub fn pipeline(&self, config: PipelineConfig) -> AgenticRag {
        pipeline_with(self.registry(), config)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Pipeline over `registry`; web planning follows whether the registry
/// has a web tool.
pub fn pipeline_with(registry: ToolRegistry, config: PipelineConfig) -> AgenticRag {
    let planner = QueryPlanner::new(PlannerConfig {
        enable_web_search: registry.has_tool(rag_types::WEB_SEARCH),
        ..Default::default()
    });
    AgenticRag::new(Arc::new(registry), Arc::new(planner), config)
}

/// A small machine learning corpus with one off-topic document.
pub fn sample_documents() -> Vec<Document> {
    vec![
        Document::new(
            "ml-intro",
            "Machine learning is a field of artificial intelligence that learns patterns from data. \
             Models improve their predictions as they see more examples.",
        )
        .with_source("intro.md")
        .with_page(1),
        Document::new(
            "supervised",
            "Supervised learning trains models on labeled examples. \
             Classification and regression are common supervised learning tasks.",
        )
        .with_source("textbook.pdf")
        .with_page(12),
        Document::new(
            "unsupervised",
            "Unsupervised learning finds structure in unlabeled data. \
             Clustering and dimensionality reduction are typical unsupervised learning methods.",
        )
        .with_source("textbook.pdf")
        .with_page(27),
        Document::new(
            "rag",
            "Retrieval augmented generation grounds a language model answer in retrieved passages. \
             Retrieval quality bounds answer quality.",
        )
        .with_source("rag-notes.md"),
        Document::new(
            "cooking",
            "Bread dough rises when yeast ferments the sugars in flour.",
        )
        .with_source("recipes.md"),
    ]
}

/// Web hits for time-sensitive queries.
pub fn sample_web_hits() -> Vec<WebHit> {
    vec![
        WebHit::new(
            "Machine learning news",
            "Recent machine learning research focuses on efficient training of large models.",
            "https://news.example.com/ml",
        ),
        WebHit::new(
            "Conference roundup",
            "This year's machine learning conferences highlighted retrieval augmented models.",
            "https://conf.example.com/roundup",
        ),
    ]
}

/// Planner that always fails.
pub struct FailingPlanner;

impl Planner for FailingPlanner {
    fn create_plan(&self, _query: &str) -> Result<QueryPlan, PlanError> {
        Err(PlanError::EmptyQuery)
    }
}
