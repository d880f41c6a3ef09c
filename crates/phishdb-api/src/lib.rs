//! Read-only JSON API over the phishing record store.
//!
//! Exposes an axum [`Router`] backed by any [`RecordStore`]. The API never
//! writes; the fetcher owns the store's contents.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/download_report` | `?from=<epoch>[&to=<epoch>]`; URLs plus TLD histogram |
//! | `GET`  | `/search_domain` | `?domain=<text>`; case-insensitive URL substring match |

pub mod error;
pub mod report;
pub mod search;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use phishdb_core::store::RecordStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `phishdb.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub table:      String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      host:       "0.0.0.0".to_owned(),
      port:       8080,
      store_path: PathBuf::from("phishdb.sqlite3"),
      table:      phishdb_store_sqlite::DEFAULT_TABLE.to_owned(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `store`.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RecordStore + 'static,
{
  Router::new()
    .route("/download_report", get(report::handler::<S>))
    .route("/search_domain", get(search::handler::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(store)
}
