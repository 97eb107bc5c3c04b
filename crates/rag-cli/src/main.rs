//! Agentic RAG command-line tool.
//!
//! # Usage
//!
//! ```bash
//! agentic-rag query "What is machine learning?" --corpus docs.json [--json]
//! agentic-rag chat --corpus docs.json < questions.txt
//! agentic-rag plan "Compare BM25 vs dense retrieval"
//! agentic-rag config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/agentic-rag/config.toml)
//! 3. File given with --config
//! 4. Environment variables (AGENTIC_RAG_*)
//! 5. CLI flags

use std::io;

use anyhow::Result;
use clap::Parser;

use rag_cli::{
    init_logging, load_settings, render_config, render_plan, run_chat, run_query, Cli, Commands,
    QueryOptions,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;

    match cli.command {
        Commands::Query {
            text,
            corpus,
            json,
            no_reflection,
            max_iterations,
        } => {
            init_logging(&settings)?;
            let options = QueryOptions {
                json,
                no_reflection,
                max_iterations,
            };
            println!("{}", run_query(settings, &text, &corpus, &options).await?);
        }
        Commands::Chat {
            corpus,
            json,
            no_reflection,
            max_iterations,
        } => {
            init_logging(&settings)?;
            let options = QueryOptions {
                json,
                no_reflection,
                max_iterations,
            };
            run_chat(settings, &corpus, &options, io::stdin().lock(), io::stdout().lock()).await?;
        }
        Commands::Plan { text } => {
            init_logging(&settings)?;
            println!("{}", render_plan(&settings, &text)?);
        }
        Commands::Config => {
            println!("{}", render_config(&settings)?);
        }
    }

    Ok(())
}
