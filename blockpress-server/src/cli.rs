use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "blockpress-server", about = "Document API for the blockpress editor")]
pub struct Cli {
    /// Listen address for the HTTP API
    #[arg(long, env = "BLOCKPRESS_ADDR", default_value = "127.0.0.1:8080")]
    pub listen_addr: String,

    /// JSON snapshot the documents are loaded from and flushed to.
    /// Without it, documents live in memory only.
    #[arg(long, env = "BLOCKPRESS_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Seconds between snapshot flushes
    #[arg(long, env = "BLOCKPRESS_FLUSH_SECS", default_value = "5")]
    pub flush_secs: u64,

    /// Identity used when a request carries no x-user-id header
    #[arg(long, env = "BLOCKPRESS_DEFAULT_USER", default_value = "local")]
    pub default_user: String,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // Rate limiting options
    // ─────────────────────────────────────────────────────────────────────────

    /// Enable rate limiting for write operations.
    #[arg(long, env = "BLOCKPRESS_RATE_LIMIT", default_value = "true")]
    pub rate_limit: bool,

    /// Maximum burst of writes per user.
    #[arg(long, env = "BLOCKPRESS_RATE_BURST", default_value = "20")]
    pub rate_burst: u32,

    /// Sustained writes per second per user.
    #[arg(long, env = "BLOCKPRESS_RATE_PER_SEC", default_value = "2.0")]
    pub rate_per_sec: f64,
}
