//! Command-line interface for maestro.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

pub use commands::config::ConfigCommands;
pub use commands::run::RunArgs;

/// Staged multi-agent task orchestrator
#[derive(Parser, Debug)]
#[command(name = "maestro", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .maestro/config.yaml merged with .maestro/local.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a task through the pipeline
    Run(RunArgs),

    /// Inspect or validate configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// List registered workers
    Workers,

    /// Show recent runs from the execution history
    History {
        /// Number of runs to show
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },
}

/// Load configuration from `path`, or from the project hierarchy when unset.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Print `err` and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("error:").red().bold());
    }
    std::process::exit(1);
}
