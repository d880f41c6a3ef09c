//! The `RecordStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `phishdb-store-sqlite`).
//! The fetcher drives [`RecordStore::replace_all`]; the read API only uses the
//! query methods.

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::record::PhishingRecord;

/// Outcome of a committed snapshot replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
  /// Rows written in the committed snapshot.
  pub inserted:      u64,
  /// Rows whose `phish_id` also appears on an earlier row of the snapshot.
  pub duplicate_ids: u64,
}

/// Abstraction over the phishing record store.
///
/// All methods return `Send` futures so the store can be shared across tasks
/// in a multi-threaded runtime.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Replace the whole collection with the records received on `records`.
  ///
  /// Runs as a single transaction: the existing rows are cleared, then each
  /// received record is inserted in arrival order. The transaction commits
  /// only once the sender side is closed without `cancel` having fired. Any
  /// failure, or cancellation, rolls back and leaves the previous snapshot in
  /// place.
  fn replace_all(
    &self,
    records: mpsc::Receiver<PhishingRecord>,
    cancel: CancellationToken,
  ) -> impl Future<Output = Result<ReplaceSummary, Self::Error>> + Send + '_;

  /// Number of records in the current snapshot.
  fn count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Records whose `submission_epoch` lies in `from..=to`.
  fn find_by_submission_range(
    &self,
    from: i64,
    to: i64,
  ) -> impl Future<Output = Result<Vec<PhishingRecord>, Self::Error>> + Send + '_;

  /// Records whose `url` contains `needle`, ignoring ASCII case. The needle
  /// is matched literally.
  fn search_url<'a>(
    &'a self,
    needle: &'a str,
  ) -> impl Future<Output = Result<Vec<PhishingRecord>, Self::Error>> + Send + 'a;
}
