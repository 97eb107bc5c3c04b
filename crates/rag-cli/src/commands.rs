//! Command implementations for `agentic-rag`.
//!
//! Handles:
//! - query: load a corpus, build the pipeline, answer one question
//! - chat: answer questions read line by line, sharing conversation memory
//! - plan: show the plan for a question without running tools
//! - config: show the effective settings

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use rag_orchestrator::{AgenticRag, ConversationMemory};
use rag_planner::{Planner, QueryPlanner};
use rag_reflection::{ConfidenceScorer, ReflectionEngine};
use rag_tools::{
    Corpus, HttpWebSearch, HttpWebSearchConfig, ToolRegistry, WebSearchProvider,
};
use rag_types::{AgenticRagResponse, Settings};

/// Input lines that end a chat session.
const CHAT_EXIT: [&str; 2] = ["exit", "quit"];

/// Options for the `query` and `chat` commands.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub json: bool,
    pub no_reflection: bool,
    pub max_iterations: Option<u32>,
}

/// Load settings and apply CLI overrides.
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Web search backend from settings, if an endpoint is configured.
fn web_provider(settings: &Settings) -> Result<Option<Box<dyn WebSearchProvider>>> {
    let Some(config) = HttpWebSearchConfig::from_settings(&settings.tools.web_search) else {
        return Ok(None);
    };
    let provider = HttpWebSearch::new(config).context("Failed to build web search client")?;
    Ok(Some(Box::new(provider)))
}

/// Assemble the pipeline over `corpus`.
pub fn build_pipeline(settings: &Settings, corpus: Arc<Corpus>) -> Result<AgenticRag> {
    let web = web_provider(settings)?;
    let mut planner_config = settings.planner.clone();
    if web.is_none() && planner_config.enable_web_search {
        warn!("No web search endpoint configured, planning without web search");
        planner_config.enable_web_search = false;
    }

    let registry = ToolRegistry::with_defaults(
        corpus,
        web,
        &settings.tools,
        settings.planner.default_top_k,
    );
    info!(tools = ?registry.tool_names(), "Tool registry ready");

    Ok(AgenticRag::new(
        Arc::new(registry),
        Arc::new(QueryPlanner::new(planner_config)),
        settings.pipeline.clone(),
    )
    .with_scorer(ConfidenceScorer::new(settings.scorer.clone()))
    .with_reflection(ReflectionEngine::new(settings.reflection.clone())))
}

/// Apply the CLI overrides, validate, and build the pipeline over the
/// corpus at `corpus_path`.
fn prepare(
    settings: &mut Settings,
    corpus_path: &Path,
    options: &QueryOptions,
) -> Result<AgenticRag> {
    if options.no_reflection {
        settings.pipeline.enable_reflection = false;
    }
    if let Some(max_iterations) = options.max_iterations {
        settings.reflection.max_iterations = max_iterations;
    }
    settings.validate().context("Invalid configuration")?;

    let corpus = Corpus::load_json(corpus_path)
        .with_context(|| format!("Failed to load corpus from {}", corpus_path.display()))?;
    build_pipeline(settings, Arc::new(corpus))
}

fn render(response: &AgenticRagResponse, options: &QueryOptions, pretty: bool) -> Result<String> {
    if !options.json {
        return Ok(response.to_markdown());
    }
    let rendered = if pretty {
        serde_json::to_string_pretty(response)
    } else {
        serde_json::to_string(response)
    };
    rendered.context("Failed to serialize response")
}

/// Answer `text` over the corpus at `corpus_path`; returns the rendered
/// response.
pub async fn run_query(
    mut settings: Settings,
    text: &str,
    corpus_path: &Path,
    options: &QueryOptions,
) -> Result<String> {
    let rag = prepare(&mut settings, corpus_path, options)?;
    let response = rag.query(text, None).await?;
    render(&response, options, true)
}

/// Answer each line of `input` as one turn of a conversation, writing the
/// rendered responses to `output`. Blank lines are skipped; `exit` or
/// `quit` ends the session. A failed turn is reported and the session
/// continues. Returns the number of answered turns.
pub async fn run_chat<R: BufRead, W: Write>(
    mut settings: Settings,
    corpus_path: &Path,
    options: &QueryOptions,
    input: R,
    mut output: W,
) -> Result<usize> {
    let rag = prepare(&mut settings, corpus_path, options)?;
    let mut memory = ConversationMemory::new(settings.memory.clone());
    let mut answered = 0;

    for line in input.lines() {
        let line = line.context("Failed to read question")?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if CHAT_EXIT.contains(&text.to_lowercase().as_str()) {
            break;
        }

        match rag.query(text, Some(&mut memory)).await {
            Ok(response) => {
                writeln!(output, "{}", render(&response, options, false)?)?;
                answered += 1;
            }
            Err(e) => {
                warn!(error = %e, "Chat turn failed");
                writeln!(output, "Error: {}", e)?;
            }
        }
        output.flush()?;
    }

    info!(turns = answered, messages = memory.len(), "Chat session ended");
    Ok(answered)
}

/// The plan for `text` as pretty JSON.
pub fn render_plan(settings: &Settings, text: &str) -> Result<String> {
    let planner = QueryPlanner::new(settings.planner.clone());
    let plan = planner.create_plan(text).context("Failed to plan query")?;
    serde_json::to_string_pretty(&plan).context("Failed to serialize plan")
}

/// The effective settings as TOML, with any API key masked.
pub fn render_config(settings: &Settings) -> Result<String> {
    let mut shown = settings.clone();
    if shown.tools.web_search.api_key.is_some() {
        shown.tools.web_search.api_key = Some("********".to_string());
    }
    toml::to_string_pretty(&shown).context("Failed to render configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn corpus_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"document_id": "ml-intro", "content": "Machine learning is a field of artificial intelligence that learns patterns from data.", "source": "ml.md"}},
                {{"document_id": "bread", "content": "Bread dough rises when yeast ferments sugars."}}
            ]"#
        )
        .unwrap();
        file
    }

    #[tokio::test]
    async fn test_run_query_markdown() {
        let file = corpus_file();
        let output = run_query(
            Settings::default(),
            "What is machine learning?",
            file.path(),
            &QueryOptions::default(),
        )
        .await
        .unwrap();

        assert!(output.starts_with("## Answer"));
        assert!(output.contains("Machine learning is a field"));
        assert!(output.contains("ml-intro"));
    }

    #[tokio::test]
    async fn test_run_query_json_without_reflection() {
        let file = corpus_file();
        let options = QueryOptions {
            json: true,
            no_reflection: true,
            max_iterations: None,
        };
        let output = run_query(Settings::default(), "What is machine learning?", file.path(), &options)
            .await
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["trace"]["iterations_used"], 1);
        assert!(value.get("quality").is_none());
    }

    #[tokio::test]
    async fn test_run_query_missing_corpus() {
        let err = run_query(
            Settings::default(),
            "What is machine learning?",
            Path::new("/nonexistent/corpus.json"),
            &QueryOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Failed to load corpus"));
    }

    #[tokio::test]
    async fn test_invalid_override_rejected() {
        let file = corpus_file();
        let options = QueryOptions {
            max_iterations: Some(0),
            ..Default::default()
        };
        let err = run_query(Settings::default(), "q", file.path(), &options)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[tokio::test]
    async fn test_run_chat_shares_memory() {
        let file = corpus_file();
        let input = std::io::Cursor::new(
            "What is machine learning?\n\n  \nHow does it learn patterns?\nquit\nignored?\n",
        );
        let mut output = Vec::new();

        let answered = run_chat(
            Settings::default(),
            file.path(),
            &QueryOptions::default(),
            input,
            &mut output,
        )
        .await
        .unwrap();

        assert_eq!(answered, 2);
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("## Answer").count(), 2);
        assert!(text.contains("Machine learning is a field"));
    }

    #[tokio::test]
    async fn test_run_chat_json_lines() {
        let file = corpus_file();
        let options = QueryOptions {
            json: true,
            no_reflection: true,
            max_iterations: None,
        };
        let input = std::io::Cursor::new("What is machine learning?\nWhat about bread dough?\n");
        let mut output = Vec::new();

        let answered = run_chat(Settings::default(), file.path(), &options, input, &mut output)
            .await
            .unwrap();

        assert_eq!(answered, 2);
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["answer"].is_string());
        }
    }

    #[tokio::test]
    async fn test_run_chat_rejects_bad_memory_config() {
        let file = corpus_file();
        let mut settings = Settings::default();
        settings.memory.summary_tokens = 0;

        let err = run_chat(
            settings,
            file.path(),
            &QueryOptions::default(),
            std::io::Cursor::new("hello\n"),
            Vec::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_render_plan() {
        let output = render_plan(&Settings::default(), "Calculate 15% of 80").unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["intent_analysis"]["intent"], "calculation");
        assert_eq!(value["steps"][0]["tool_selection"]["tool_name"], "calculator");
    }

    #[test]
    fn test_render_config_masks_key() {
        let mut settings = Settings::default();
        settings.tools.web_search.api_key = Some("secret-key".to_string());
        let output = render_config(&settings).unwrap();

        assert!(output.contains("log_level = \"info\""));
        assert!(output.contains("[reflection]"));
        assert!(!output.contains("secret-key"));
    }
}
