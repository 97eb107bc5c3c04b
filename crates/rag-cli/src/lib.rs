//! Library side of the `agentic-rag` binary.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (query, chat, plan, config)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    build_pipeline, init_logging, load_settings, render_config, render_plan, run_chat, run_query,
    QueryOptions,
};
