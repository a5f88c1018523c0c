//! `immich`: command-line client for an Immich server.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod adapter;
mod cli;
mod commands;
mod config;
mod output;
mod progress;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose { "info,immich=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match commands::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
