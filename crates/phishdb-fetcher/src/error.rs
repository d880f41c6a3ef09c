//! Error type for one ingest cycle.
//!
//! Every failure inside a cycle surfaces as exactly one of these; the
//! scheduler decides whether to retry.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  /// The feed could not be reached.
  #[error("error fetching feed: {0}")]
  Transport(#[source] reqwest::Error),

  #[error("unexpected status code: {0}")]
  UnexpectedStatus(reqwest::StatusCode),

  /// The body was not a feed array, or one of its elements was invalid.
  #[error("feed error: {0}")]
  Feed(#[from] phishdb_feed::Error),

  /// The store rejected the snapshot; its transaction was rolled back.
  #[error("sink error: {0}")]
  Sink(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("sink finished before the feed was exhausted")]
  SinkExitedEarly,

  #[error("sink task failed: {0}")]
  SinkTask(#[from] tokio::task::JoinError),

  #[error("cycle cancelled")]
  Cancelled,

  #[error("attempt exceeded its {0:?} deadline")]
  Timeout(Duration),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
