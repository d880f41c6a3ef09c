//! Error types for `phishdb-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid submission time {value:?}: {source}")]
  TimeFormat {
    value:  String,
    #[source]
    source: chrono::ParseError,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
