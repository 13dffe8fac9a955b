use anyhow::Result;
use clap::Parser;

use blockpress_server::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    blockpress_server::run_with_cli(Cli::parse()).await
}
