//! CLI argument parsing for `agentic-rag`.
//!
//! CLI flags override every other configuration source.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Agentic RAG
///
/// Plans a query, runs retrieval tools, and refines the answer through
/// reflection.
#[derive(Parser, Debug)]
#[command(name = "agentic-rag")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/agentic-rag/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question over a JSON corpus
    Query {
        /// The question
        text: String,

        /// JSON file holding an array of documents
        #[arg(long)]
        corpus: PathBuf,

        /// Print the full response as JSON instead of markdown
        #[arg(long)]
        json: bool,

        /// Skip the reflection and correction loop
        #[arg(long)]
        no_reflection: bool,

        /// Override reflection.max_iterations
        #[arg(long)]
        max_iterations: Option<u32>,
    },

    /// Answer questions read from stdin, one per line, as one conversation
    Chat {
        /// JSON file holding an array of documents
        #[arg(long)]
        corpus: PathBuf,

        /// Print each response as one line of JSON instead of markdown
        #[arg(long)]
        json: bool,

        /// Skip the reflection and correction loop
        #[arg(long)]
        no_reflection: bool,

        /// Override reflection.max_iterations
        #[arg(long)]
        max_iterations: Option<u32>,
    },

    /// Print the plan a question would run, as JSON
    Plan {
        /// The question
        text: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_query() {
        let cli = Cli::parse_from([
            "agentic-rag",
            "query",
            "What is machine learning?",
            "--corpus",
            "docs.json",
            "--max-iterations",
            "2",
        ]);
        match cli.command {
            Commands::Query {
                text,
                corpus,
                json,
                no_reflection,
                max_iterations,
            } => {
                assert_eq!(text, "What is machine learning?");
                assert_eq!(corpus, PathBuf::from("docs.json"));
                assert!(!json);
                assert!(!no_reflection);
                assert_eq!(max_iterations, Some(2));
            }
            _ => panic!("Expected Query command"),
        }
    }

    #[test]
    fn test_cli_query_requires_corpus() {
        assert!(Cli::try_parse_from(["agentic-rag", "query", "hello"]).is_err());
    }

    #[test]
    fn test_cli_query_flags() {
        let cli = Cli::parse_from([
            "agentic-rag",
            "query",
            "q",
            "--corpus",
            "c.json",
            "--json",
            "--no-reflection",
        ]);
        match cli.command {
            Commands::Query {
                json, no_reflection, ..
            } => {
                assert!(json);
                assert!(no_reflection);
            }
            _ => panic!("Expected Query command"),
        }
    }

    #[test]
    fn test_cli_chat() {
        let cli = Cli::parse_from(["agentic-rag", "chat", "--corpus", "docs.json", "--json"]);
        match cli.command {
            Commands::Chat {
                corpus,
                json,
                no_reflection,
                max_iterations,
            } => {
                assert_eq!(corpus, PathBuf::from("docs.json"));
                assert!(json);
                assert!(!no_reflection);
                assert_eq!(max_iterations, None);
            }
            _ => panic!("Expected Chat command"),
        }
        assert!(Cli::try_parse_from(["agentic-rag", "chat"]).is_err());
    }

    #[test]
    fn test_cli_plan() {
        let cli = Cli::parse_from(["agentic-rag", "plan", "Compare BM25 vs dense retrieval"]);
        match cli.command {
            Commands::Plan { text } => assert_eq!(text, "Compare BM25 vs dense retrieval"),
            _ => panic!("Expected Plan command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "agentic-rag",
            "config",
            "--config",
            "/path/to/config.toml",
            "--log-level",
            "debug",
        ]);
        assert!(matches!(cli.command, Commands::Config));
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }
}
