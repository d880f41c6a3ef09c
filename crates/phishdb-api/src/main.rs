//! phishdb API server binary.
//!
//! Reads `phishdb.toml` (or the path given with `--config`), overlays
//! `PHISHDB_*` environment variables, opens the SQLite store and serves the
//! read-only API until interrupted.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use phishdb_api::{ApiConfig, api_router};
use phishdb_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Serve phishing records over HTTP")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "phishdb.toml")]
  config: PathBuf,

  /// Emit logs as JSON lines.
  #[arg(long)]
  log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();
  if cli.log_json {
    tracing_subscriber::fmt().json().with_env_filter(filter).init();
  } else {
    tracing_subscriber::fmt().with_env_filter(filter).init();
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PHISHDB").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let cfg: ApiConfig = settings
    .try_deserialize()
    .context("failed to deserialise ApiConfig")?;

  let store = SqliteStore::open(&cfg.store_path, &cfg.table)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  let app = api_router(Arc::new(store));

  let addr = format!("{}:{}", cfg.host, cfg.port);
  let listener = TcpListener::bind(&addr)
    .await
    .with_context(|| format!("failed to bind {addr}"))?;
  tracing::info!("listening on {addr}");

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
      }
      tracing::info!("shutdown requested");
    })
    .await
    .context("server error")?;

  Ok(())
}
