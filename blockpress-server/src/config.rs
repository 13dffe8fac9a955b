use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use blockpress_types::UserId;

use crate::cli::Cli;
use crate::ratelimit::RateLimitConfig;

/// Runtime configuration derived from CLI/env.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub data_file: Option<PathBuf>,
    pub flush_interval: Duration,
    pub default_user: UserId,
    pub rate_limit: RateLimitConfig,
}

impl ServerConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.default_user.trim().is_empty() {
            bail!("default user must not be empty");
        }
        if cli.flush_secs == 0 {
            bail!("flush interval must be at least one second");
        }
        if cli.rate_limit && (cli.rate_burst == 0 || cli.rate_per_sec <= 0.0) {
            bail!("rate limit needs a positive burst and refill rate");
        }

        let data_file = match &cli.data_file {
            Some(path) if path.is_relative() => Some(std::env::current_dir()?.join(path)),
            other => other.clone(),
        };

        Ok(Self {
            listen_addr: cli.listen_addr.clone(),
            data_file,
            flush_interval: Duration::from_secs(cli.flush_secs),
            default_user: UserId::new(cli.default_user.trim()),
            rate_limit: RateLimitConfig {
                burst: cli.rate_burst,
                refill_rate: cli.rate_per_sec,
                enabled: cli.rate_limit,
            },
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            data_file: None,
            flush_interval: Duration::from_secs(5),
            default_user: UserId::new("local"),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
