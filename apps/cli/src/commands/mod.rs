//! Subcommand handlers.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use immich_client::{Client, ClientConfig};

use crate::cli::{Cli, Command};
use crate::config::CliConfig;

mod album;
mod asset;
mod config;
mod job;
mod server;
mod tag;

/// State shared by every handler.
pub struct Context {
    pub client: Arc<Client>,
    pub config: CliConfig,
    pub json: bool,
    pub verbose: bool,
}

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let file_config = CliConfig::load();

    if let Command::Config(cmd) = &cli.command {
        config::run(&cli, file_config, cmd)?;
        return Ok(ExitCode::SUCCESS);
    }

    let client_config = client_config(&cli, &file_config)?;
    let client = Client::new(&client_config).context("cannot create API client")?;
    let ctx = Context {
        client: Arc::new(client),
        config: file_config,
        json: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Command::Server(cmd) => server::run(&ctx, cmd).await?,
        Command::Asset(cmd) => return asset::run(&ctx, cmd).await,
        Command::Album(cmd) => album::run(&ctx, cmd).await?,
        Command::Tag(cmd) => tag::run(&ctx, cmd).await?,
        Command::Job(cmd) => job::run(&ctx, cmd).await?,
        Command::Config(_) => {}
    }
    Ok(ExitCode::SUCCESS)
}

/// Flags and environment win over the config file.
fn client_config(cli: &Cli, file: &CliConfig) -> anyhow::Result<ClientConfig> {
    let endpoint = cli
        .endpoint
        .clone()
        .or_else(|| file.endpoint.clone())
        .ok_or_else(|| anyhow!("no endpoint: pass --endpoint or set IMMICH_ENDPOINT"))?;
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| file.api_key.clone())
        .ok_or_else(|| anyhow!("no API key: pass --api-key or set IMMICH_API_KEY"))?;
    let timeout = Duration::try_from_secs_f64(cli.timeout)
        .map_err(|_| anyhow!("invalid timeout: {}", cli.timeout))?;

    let mut config = ClientConfig::new(endpoint, api_key);
    config.verify_tls = !cli.no_verify_ssl;
    config.timeout = timeout;
    config.dry_run = cli.dry_run;
    Ok(config)
}

/// Pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
