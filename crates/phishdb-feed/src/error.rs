//! Error types for the phishdb feed codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The body does not start with a JSON array.
  #[error("malformed feed: {0}")]
  MalformedFeed(String),

  /// An array element is not a valid feed item.
  #[error("failed to decode feed element: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("invalid record: {0}")]
  Record(#[from] phishdb_core::Error),

  #[error("read error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
