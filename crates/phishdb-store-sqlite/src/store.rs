//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].

use std::{path::Path, sync::Arc};

use phishdb_core::{
  record::PhishingRecord,
  store::{RecordStore, ReplaceSummary},
};
use rusqlite::TransactionBehavior;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
  Error, Result, Stage,
  encode::{COLUMNS, RawRecord, contains_pattern, encode_details, insert_sql},
  schema::{PRAGMAS, table_ddl},
};

/// Table used when the deployment does not name one.
pub const DEFAULT_TABLE: &str = "phishing_records";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A phishing record store backed by one table in a SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  table:           Arc<str>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` using `table` as the collection.
  pub async fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
    let table = validate_table(table)?;
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, table };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, table: Arc::from(DEFAULT_TABLE) };
    store.init_schema().await?;
    Ok(store)
  }

  pub fn table(&self) -> &str { &self.table }

  async fn init_schema(&self) -> Result<()> {
    let ddl = table_ddl(&self.table);
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn select(
    &self,
    filter: &'static str,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<PhishingRecord>> {
    let sql = format!(
      "SELECT {COLUMNS} FROM {} WHERE {filter} ORDER BY row_id",
      self.table
    );

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

/// Table names are spliced into SQL, so only plain identifiers are allowed.
fn validate_table(table: &str) -> Result<Arc<str>> {
  let mut chars = table.chars();
  let valid = chars
    .next()
    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
  if !valid {
    return Err(Error::InvalidTableName(table.to_owned()));
  }
  Ok(Arc::from(table))
}

// ─── Snapshot replacement ────────────────────────────────────────────────────

/// Clear `table` and insert every record received on `records`, all inside
/// one transaction. Runs on the connection thread, so it blocks on the
/// channel rather than awaiting it.
///
/// Returning early drops the transaction, which rolls it back.
fn replace_snapshot(
  conn: &mut rusqlite::Connection,
  table: &str,
  mut records: mpsc::Receiver<PhishingRecord>,
  cancel: &CancellationToken,
) -> Result<ReplaceSummary> {
  let tx = conn
    .transaction_with_behavior(TransactionBehavior::Immediate)
    .map_err(Error::SessionStart)?;

  let cleared = tx
    .execute(&format!("DELETE FROM {table}"), [])
    .map_err(Error::aborted(Stage::Clear))?;
  tracing::debug!(cleared, "cleared collection");

  let mut inserted = 0u64;
  {
    let mut stmt = tx
      .prepare(&insert_sql(table))
      .map_err(Error::aborted(Stage::Insert))?;

    loop {
      if cancel.is_cancelled() {
        return Err(Error::Cancelled);
      }
      let Some(record) = records.blocking_recv() else {
        break;
      };

      let details = encode_details(&record.details)?;
      stmt
        .execute(rusqlite::params![
          record.phish_id,
          record.url,
          record.phish_detail_url,
          record.submission_time,
          record.submission_epoch,
          record.verified,
          record.verification_time,
          record.online,
          record.target,
          details,
        ])
        .map_err(Error::aborted(Stage::Insert))?;
      inserted += 1;
      tracing::trace!(phish_id = record.phish_id, "inserted record");
    }
  }

  // A closed channel only means "done" if the producer did not give up.
  if cancel.is_cancelled() {
    return Err(Error::Cancelled);
  }

  let distinct: i64 = tx
    .query_row(&format!("SELECT COUNT(DISTINCT phish_id) FROM {table}"), [], |r| {
      r.get(0)
    })
    .map_err(Error::aborted(Stage::Commit))?;
  let duplicate_ids = inserted.saturating_sub(distinct.max(0) as u64);

  tx.commit().map_err(Error::aborted(Stage::Commit))?;

  Ok(ReplaceSummary { inserted, duplicate_ids })
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn replace_all(
    &self,
    records: mpsc::Receiver<PhishingRecord>,
    cancel: CancellationToken,
  ) -> Result<ReplaceSummary> {
    let table = Arc::clone(&self.table);
    let span = tracing::Span::current();
    tracing::info!(table = %table, "starting snapshot replacement");

    let summary = self
      .conn
      .call(move |conn| {
        let _entered = span.enter();
        Ok(replace_snapshot(conn, &table, records, &cancel))
      })
      .await??;

    if summary.duplicate_ids > 0 {
      tracing::warn!(
        duplicate_ids = summary.duplicate_ids,
        "feed contained repeated phish_id values; stored as separate rows"
      );
    }
    tracing::info!(inserted = summary.inserted, "snapshot committed");
    Ok(summary)
  }

  async fn count(&self) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", self.table);
    let n: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
      .await?;
    Ok(n.max(0) as u64)
  }

  async fn find_by_submission_range(
    &self,
    from: i64,
    to: i64,
  ) -> Result<Vec<PhishingRecord>> {
    self
      .select(
        "submission_epoch BETWEEN ?1 AND ?2",
        vec![from.into(), to.into()],
      )
      .await
  }

  async fn search_url(&self, needle: &str) -> Result<Vec<PhishingRecord>> {
    self
      .select(
        "url LIKE ?1 ESCAPE '\\'",
        vec![contains_pattern(needle).into()],
      )
      .await
  }
}
