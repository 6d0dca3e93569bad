//! CLI entry point and dispatch
//!
//! `run()` parses arguments, installs logging, discovers configuration,
//! builds the tokio runtime and dispatches. It prints every error itself;
//! main.rs only maps the returned [`ExitCode`].

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;

use rfpflow_config::{CliArgs, Config};
use rfpflow_utils::ExitCode;
use rfpflow_utils::logging::init_tracing;

pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.json_logs) {
        eprintln!("✗ Failed to initialize logging: {e}");
        return Err(ExitCode::INTERNAL);
    }

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        bind: match &cli.command {
            Commands::Serve { bind } => bind.clone(),
            Commands::Config { .. } => None,
        },
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            commands::report_error(&err, "config");
            return Err(ExitCode::CONFIG);
        }
    };

    match cli.command {
        Commands::Config { sources } => commands::config::execute(&config, sources),
        Commands::Serve { .. } => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("✗ Failed to create async runtime: {e}");
                    return Err(ExitCode::INTERNAL);
                }
            };
            rt.block_on(commands::serve::execute(config))
        }
    }
}
