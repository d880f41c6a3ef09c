//! Fetcher configuration, deserialised from `phishdb.toml` and `PHISHDB_*`
//! environment variables.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{Error, Result};

/// Everything the ingest loop needs, passed explicitly at construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
  /// Location of the JSON feed.
  pub feed_url:             String,
  /// Value of the `User-Agent` header sent with every feed request.
  pub user_agent:           String,
  /// Interval between scheduled ticks.
  pub fetch_period_secs:    u64,
  /// Retries per tick after the initial attempt.
  pub retry_limit:          u32,
  /// Wall-clock budget of a single attempt.
  pub attempt_timeout_secs: u64,
  /// Pause between a failed attempt and the next retry.
  pub retry_backoff_secs:   u64,
  /// Records that may sit in the decoder → sink channel at once.
  pub handoff_capacity:     usize,
  /// SQLite database file.
  pub store_path:           PathBuf,
  /// Table holding the snapshot.
  pub table:                String,
}

impl Default for FetcherConfig {
  fn default() -> Self {
    Self {
      feed_url:             "http://data.phishtank.com/data/online-valid.json".to_owned(),
      user_agent:           "phishtank/phishdb".to_owned(),
      fetch_period_secs:    60 * 60,
      retry_limit:          10,
      attempt_timeout_secs: 60,
      retry_backoff_secs:   60,
      handoff_capacity:     1,
      store_path:           PathBuf::from("phishdb.sqlite3"),
      table:                phishdb_store_sqlite::DEFAULT_TABLE.to_owned(),
    }
  }
}

impl FetcherConfig {
  pub fn fetch_period(&self) -> Duration { Duration::from_secs(self.fetch_period_secs) }

  pub fn attempt_timeout(&self) -> Duration { Duration::from_secs(self.attempt_timeout_secs) }

  pub fn retry_backoff(&self) -> Duration { Duration::from_secs(self.retry_backoff_secs) }

  /// Reject settings the scheduler cannot run with.
  pub fn validate(&self) -> Result<()> {
    if self.feed_url.trim().is_empty() {
      return Err(Error::InvalidConfig("feed_url must not be empty".into()));
    }
    if self.fetch_period_secs == 0 {
      return Err(Error::InvalidConfig("fetch_period_secs must be positive".into()));
    }
    if self.attempt_timeout_secs == 0 {
      return Err(Error::InvalidConfig("attempt_timeout_secs must be positive".into()));
    }
    if self.handoff_capacity == 0 {
      return Err(Error::InvalidConfig("handoff_capacity must be at least 1".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let cfg = FetcherConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.fetch_period(), Duration::from_secs(3600));
    assert_eq!(cfg.retry_limit, 10);
    assert_eq!(cfg.table, "phishing_records");
  }

  #[test]
  fn zero_durations_are_rejected() {
    let cfg = FetcherConfig { fetch_period_secs: 0, ..Default::default() };
    assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

    let cfg = FetcherConfig { attempt_timeout_secs: 0, ..Default::default() };
    assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

    let cfg = FetcherConfig { handoff_capacity: 0, ..Default::default() };
    assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
  }

  #[test]
  fn zero_backoff_and_retries_are_allowed() {
    let cfg = FetcherConfig { retry_backoff_secs: 0, retry_limit: 0, ..Default::default() };
    cfg.validate().unwrap();
  }

  #[test]
  fn partial_sources_keep_defaults() {
    let cfg: FetcherConfig = config::Config::builder()
      .set_override("feed_url", "https://feeds.example.test/online.json")
      .unwrap()
      .set_override("retry_limit", 3)
      .unwrap()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.feed_url, "https://feeds.example.test/online.json");
    assert_eq!(cfg.retry_limit, 3);
    assert_eq!(cfg.attempt_timeout_secs, 60);
    assert_eq!(cfg.handoff_capacity, 1);
  }
}
