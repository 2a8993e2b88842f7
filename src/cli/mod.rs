//! Command-line interface for errspec.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Coordinator and archive for remote error-specification analysis.
#[derive(Parser)]
#[command(name = "errspec", version, about)]
pub struct Cli {
    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a configuration file (defaults to .errspec/config.yaml)
    #[arg(long, global = true, env = "ERRSPEC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and manage archived specifications
    Specs(commands::specs::SpecsArgs),
}

/// Render a top-level error and exit non-zero.
pub fn handle_error(err: &anyhow::Error, json: bool) -> ! {
    if json {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{body}");
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
