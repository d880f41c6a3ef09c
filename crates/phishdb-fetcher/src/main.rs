//! phishdb fetcher binary.
//!
//! Reads `phishdb.toml` (or the path given with `--config`), overlays
//! `PHISHDB_*` environment variables, opens the SQLite store and refreshes it
//! from the feed on a fixed period until interrupted.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use phishdb_fetcher::{FetcherConfig, Pipeline, Scheduler};
use phishdb_store_sqlite::SqliteStore;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Refresh the phishing record store from the feed")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "phishdb.toml")]
  config: PathBuf,

  /// Run a single tick (with retries) and exit.
  #[arg(long)]
  once: bool,

  /// Emit logs as JSON lines.
  #[arg(long)]
  log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  let cli = Cli::parse();

  // Initialise tracing.
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

  let cfg: FetcherConfig = settings
    .try_deserialize()
    .context("failed to deserialise FetcherConfig")?;
  cfg.validate()?;

  // A store that cannot be opened is fatal; feed failures are not.
  let store = SqliteStore::open(&cfg.store_path, &cfg.table)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  let pipeline = Pipeline::new(&cfg, Arc::new(store))?;
  let scheduler = Scheduler::new(&cfg, pipeline);

  if cli.once {
    let outcome = scheduler.run_tick().await;
    return Ok(if outcome.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE });
  }

  let shutdown = CancellationToken::new();
  tokio::spawn({
    let shutdown = shutdown.clone();
    async move {
      if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        return;
      }
      tracing::info!("shutdown requested");
      shutdown.cancel();
    }
  });

  scheduler.run(shutdown).await;
  Ok(ExitCode::SUCCESS)
}
