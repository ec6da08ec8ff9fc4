// ABOUTME: Entry point for the bgctl CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use std::env;
use std::path::Path;

use bgctl::config::{self, Config};
use bgctl::error::Result;
use bgctl::output::{Output, OutputMode};
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);

    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let cwd = env::current_dir()?;
    let output = Output::new(mode);

    match cli.command {
        Commands::Init { application, force } => {
            config::init_config(&cwd, application.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Promote {
            application,
            mode,
            image,
            force,
            yes_break_lock,
        } => {
            let config = load_config(cli.config.as_deref(), &cwd)?;
            let request = commands::PromoteRequest {
                application,
                mode,
                image,
                force,
                break_lock: yes_break_lock,
            };
            commands::promote(&config, &cwd, request, output).await
        }
        Commands::Status { application } => {
            let config = load_config(cli.config.as_deref(), &cwd)?;
            commands::status(&config, &application, output).await
        }
        Commands::History { application } => {
            let config = load_config(cli.config.as_deref(), &cwd)?;
            commands::history(&config, &cwd, &application, output).await
        }
        Commands::Unit { application, mode } => {
            let config = load_config(cli.config.as_deref(), &cwd)?;
            commands::unit(&config, &application, mode, output).await
        }
    }
}

/// An explicit `--config` wins over discovery from the working directory.
fn load_config(path: Option<&Path>, cwd: &Path) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::discover(cwd),
    }
}
