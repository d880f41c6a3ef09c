//! SQL schema for the phishdb SQLite store.
//!
//! Executed once at connection startup. The table name is validated by
//! [`SqliteStore::open`](crate::SqliteStore::open) before it is spliced in.

/// Connection-level settings. WAL lets readers on other connections keep
/// seeing the last committed snapshot while a replacement is in flight;
/// `synchronous = FULL` makes a commit durable before it returns.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = FULL;
";

/// Table DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// `phish_id` is not unique: a feed carrying duplicates is
/// stored as-is. `row_id` preserves decode order.
pub fn table_ddl(table: &str) -> String {
  format!(
    "
CREATE TABLE IF NOT EXISTS {table} (
    row_id            INTEGER PRIMARY KEY,
    phish_id          INTEGER NOT NULL,
    url               TEXT    NOT NULL,
    phish_detail_url  TEXT    NOT NULL,
    submission_time   TEXT    NOT NULL,   -- RFC 3339, as received
    submission_epoch  INTEGER NOT NULL,   -- derived at ingest
    verified          TEXT    NOT NULL,
    verification_time TEXT    NOT NULL,
    online            TEXT    NOT NULL,
    target            TEXT    NOT NULL,
    details           TEXT    NOT NULL DEFAULT '[]'   -- JSON array
);

CREATE INDEX IF NOT EXISTS {table}_epoch_idx    ON {table}(submission_epoch);
CREATE INDEX IF NOT EXISTS {table}_phish_id_idx ON {table}(phish_id);

PRAGMA user_version = 1;
"
  )
}
