//! Encoding and decoding helpers between [`PhishingRecord`] and SQLite rows.
//!
//! Scalar fields map to their own columns; the nested `details` list is stored
//! as a compact JSON array.

use phishdb_core::record::{NetworkDetail, PhishingRecord};

use crate::Result;

/// Column list shared by every `SELECT` so row indices stay in sync with
/// [`RawRecord::from_row`].
pub const COLUMNS: &str = "phish_id, url, phish_detail_url, submission_time, \
                           submission_epoch, verified, verification_time, \
                           online, target, details";

pub fn insert_sql(table: &str) -> String {
  format!(
    "INSERT INTO {table} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
  )
}

// ─── Details ─────────────────────────────────────────────────────────────────

pub fn encode_details(details: &[NetworkDetail]) -> Result<String> {
  Ok(serde_json::to_string(details)?)
}

pub fn decode_details(s: &str) -> Result<Vec<NetworkDetail>> {
  Ok(serde_json::from_str(s)?)
}

// ─── LIKE patterns ───────────────────────────────────────────────────────────

/// Build a `LIKE … ESCAPE '\'` pattern that matches `needle` literally
/// anywhere in the column.
pub fn contains_pattern(needle: &str) -> String {
  let mut pattern = String::with_capacity(needle.len() + 2);
  pattern.push('%');
  for c in needle.chars() {
    if matches!(c, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

// ─── Raw row ─────────────────────────────────────────────────────────────────

/// A row as read from SQLite, before the details column is decoded.
pub struct RawRecord {
  pub phish_id:          i64,
  pub url:               String,
  pub phish_detail_url:  String,
  pub submission_time:   String,
  pub submission_epoch:  i64,
  pub verified:          String,
  pub verification_time: String,
  pub online:            String,
  pub target:            String,
  pub details:           String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      phish_id:          row.get(0)?,
      url:               row.get(1)?,
      phish_detail_url:  row.get(2)?,
      submission_time:   row.get(3)?,
      submission_epoch:  row.get(4)?,
      verified:          row.get(5)?,
      verification_time: row.get(6)?,
      online:            row.get(7)?,
      target:            row.get(8)?,
      details:           row.get(9)?,
    })
  }

  pub fn into_record(self) -> Result<PhishingRecord> {
    Ok(PhishingRecord {
      phish_id:          self.phish_id,
      url:               self.url,
      phish_detail_url:  self.phish_detail_url,
      submission_time:   self.submission_time,
      submission_epoch:  self.submission_epoch,
      verified:          self.verified,
      verification_time: self.verification_time,
      online:            self.online,
      target:            self.target,
      details:           decode_details(&self.details)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn like_wildcards_are_escaped() {
    assert_eq!(contains_pattern("paypal"), "%paypal%");
    assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
  }

  #[test]
  fn details_round_trip_through_json() {
    let details = vec![NetworkDetail {
      ip_address: "1.2.3.4".into(),
      rir: "ripencc".into(),
      ..Default::default()
    }];
    let encoded = encode_details(&details).unwrap();
    assert_eq!(decode_details(&encoded).unwrap(), details);
    assert_eq!(encode_details(&[]).unwrap(), "[]");
  }
}
