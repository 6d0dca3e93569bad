//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rfpflow - staged AI pipeline for RFP responses
#[derive(Debug, Parser)]
#[command(name = "rfpflow")]
#[command(about = "Serve the rfpflow RFP pipeline over HTTP")]
#[command(long_about = r#"
rfpflow takes an uploaded RFP through AI-assisted stages: analysis, vendor
matching, bill of materials, service scope and technical proposal. Each stage
runs against the AI provider selected in the admin registry.

EXAMPLES:
  # Serve on the address from rfpflow.toml
  rfpflow serve

  # Serve with an explicit config file and address
  rfpflow serve --config /etc/rfpflow.toml --bind 0.0.0.0:8000

  # Print the effective configuration with the source of each value
  rfpflow config --sources

CONFIGURATION:
  Precedence: CLI flags > config file > defaults
  The config file is --config, else $RFPFLOW_CONFIG, else ./rfpflow.toml
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Listener address, e.g. 127.0.0.1:8000
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// List each key with the source it came from instead
        #[arg(long)]
        sources: bool,
    },
}
