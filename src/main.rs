//! codedrill: sandboxed Python exercise trainer.
//!
//! Thin binary entry point: CLI parsing, environment and tracing setup, then
//! hand-off to the core server.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use codedrill_core::catalog::Catalog;
use codedrill_core::config::CoreConfig;
use codedrill_core::server;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "codedrill",
    version,
    about = "Serve sandboxed Python exercises over HTTP"
)]
struct Cli {
    /// Path to codedrill.toml (defaults to ./codedrill.toml when present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file.
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Lesson catalog JSON file (defaults to the embedded set).
    #[arg(long, value_name = "PATH")]
    lessons: Option<PathBuf>,

    /// Emit human-readable logs instead of JSON lines.
    #[arg(long)]
    plain_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (non-fatal if missing).
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.plain_logs);

    let mut config = CoreConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    let catalog = match &cli.lessons {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::builtin()?,
    };
    tracing::info!(lessons = catalog.len(), "catalog loaded");

    server::run(config, catalog).await
}

fn init_tracing(plain: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("codedrill=info,codedrill_core=info"));
    if plain {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        // JSON lines: the access log and metrics targets feed an external
        // stream that expects one structured record per line.
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    }
}
