//! Error type for `phishdb-store-sqlite`.

use std::fmt;

use thiserror::Error;

/// The step of a snapshot replacement that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Clear,
  Insert,
  Commit,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Stage::Clear => "clear",
      Stage::Insert => "insert",
      Stage::Commit => "commit",
    })
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid table name: {0:?}")]
  InvalidTableName(String),

  /// The replace transaction could not be opened.
  #[error("failed to start transaction: {0}")]
  SessionStart(#[source] rusqlite::Error),

  /// The replace transaction was rolled back after a failed step.
  #[error("transaction aborted during {stage}: {source}")]
  TransactionAborted {
    stage:  Stage,
    #[source]
    source: rusqlite::Error,
  },

  /// The producer cancelled the replacement; the transaction was rolled back.
  #[error("snapshot replacement cancelled")]
  Cancelled,
}

impl Error {
  pub(crate) fn aborted(stage: Stage) -> impl FnOnce(rusqlite::Error) -> Self {
    move |source| Error::TransactionAborted { stage, source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
