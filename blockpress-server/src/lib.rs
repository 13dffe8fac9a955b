//! blockpress-server: the HTTP document API.
//!
//! Serves one shared [`blockpress_sync::MemoryStore`] to every caller,
//! persisting it as a JSON snapshot. Clients talk to it through
//! [`blockpress_sync::HttpStore`].

pub mod auth;
pub mod cli;
pub mod config;
pub mod persist;
pub mod ratelimit;
pub mod server;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Run the server using CLI args (parsed by the caller).
pub async fn run_with_cli(cli: cli::Cli) -> Result<()> {
    init_tracing(cli.verbose)?;
    let config = ServerConfig::from_cli(&cli)?;
    server::serve(config).await
}
