//! The phishing record, the unit that flows from the feed into the store.
//!
//! A feed element is first decoded into a [`FeedItem`], which mirrors the
//! source JSON exactly. [`PhishingRecord::from_item`] then derives the
//! submission epoch once, at ingest time. A record is never constructed
//! without a valid epoch.
//!
//! Example feed element:
//!
//! ```json
//! {
//!   "phish_id": 123456,
//!   "url": "https://www.example.com/",
//!   "phish_detail_url": "http://www.phishtank.com/phish_detail.php?phish_id=123456",
//!   "submission_time": "2009-06-19T15:15:47+00:00",
//!   "verified": "yes",
//!   "verification_time": "2009-06-19T15:37:31+00:00",
//!   "online": "yes",
//!   "target": "1st National Example Bank",
//!   "details": [{
//!     "ip_address": "1.2.3.4",
//!     "cidr_block": "1.2.3.0/24",
//!     "announcing_network": "1234",
//!     "rir": "arin",
//!     "detail_time": "2006-10-01T02:30:54+00:00"
//!   }]
//! }
//! ```

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

// ─── Network attribution ─────────────────────────────────────────────────────

/// One network-attribution entry attached to a report. Has no identity of its
/// own; it is stored inline with its record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkDetail {
  pub ip_address:         String,
  pub cidr_block:         String,
  pub announcing_network: String,
  pub rir:                String,
  pub detail_time:        String,
}

// ─── Raw feed element ────────────────────────────────────────────────────────

/// A feed element exactly as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeedItem {
  pub phish_id:          i64,
  #[serde(default)]
  pub url:               String,
  #[serde(default)]
  pub phish_detail_url:  String,
  #[serde(default)]
  pub submission_time:   String,
  #[serde(default)]
  pub verified:          String,
  #[serde(default)]
  pub verification_time: String,
  #[serde(default)]
  pub online:            String,
  #[serde(default)]
  pub target:            String,
  #[serde(default, deserialize_with = "null_as_empty")]
  pub details:           Vec<NetworkDetail>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<NetworkDetail>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<Vec<NetworkDetail>>::deserialize(deserializer)?.unwrap_or_default())
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A reported phishing entry with its derived submission epoch.
///
/// `phish_id` is assigned by the feed and is not enforced unique by the
/// store; a malformed feed carrying duplicates yields duplicate rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhishingRecord {
  pub phish_id:          i64,
  pub url:               String,
  pub phish_detail_url:  String,
  /// RFC 3339 string, as received.
  pub submission_time:   String,
  /// Unix seconds derived from `submission_time`.
  pub submission_epoch:  i64,
  pub verified:          String,
  pub verification_time: String,
  pub online:            String,
  pub target:            String,
  pub details:           Vec<NetworkDetail>,
}

impl PhishingRecord {
  /// Attach the derived submission epoch to a decoded feed element.
  ///
  /// Fails with [`Error::TimeFormat`] if `submission_time` is not RFC 3339.
  pub fn from_item(item: FeedItem) -> Result<Self> {
    let submission_epoch = parse_submission_epoch(&item.submission_time)?;
    Ok(Self {
      phish_id: item.phish_id,
      url: item.url,
      phish_detail_url: item.phish_detail_url,
      submission_time: item.submission_time,
      submission_epoch,
      verified: item.verified,
      verification_time: item.verification_time,
      online: item.online,
      target: item.target,
      details: item.details,
    })
  }
}

/// Parse an RFC 3339 timestamp into seconds since the Unix epoch.
pub fn parse_submission_epoch(value: &str) -> Result<i64> {
  DateTime::parse_from_rfc3339(value)
    .map(|dt| dt.timestamp())
    .map_err(|source| Error::TimeFormat { value: value.to_owned(), source })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn epoch_of_utc_timestamp() {
    assert_eq!(parse_submission_epoch("2020-01-01T00:00:00Z").unwrap(), 1_577_836_800);
  }

  #[test]
  fn epoch_respects_offset() {
    let utc = parse_submission_epoch("2009-06-19T15:15:47+00:00").unwrap();
    let cest = parse_submission_epoch("2009-06-19T17:15:47+02:00").unwrap();
    assert_eq!(utc, cest);
    assert_eq!(utc, 1_245_424_547);
  }

  #[test]
  fn epoch_before_1970_is_negative() {
    assert_eq!(parse_submission_epoch("1969-12-31T23:59:59Z").unwrap(), -1);
  }

  #[test]
  fn epoch_is_stable_across_calls() {
    let s = "2023-03-04T05:06:07.890+01:00";
    assert_eq!(
      parse_submission_epoch(s).unwrap(),
      parse_submission_epoch(s).unwrap()
    );
  }

  #[test]
  fn malformed_times_are_rejected() {
    for bad in ["", "yesterday", "2020-01-01", "2020-01-01 00:00:00", "2020-13-01T00:00:00Z"] {
      let err = parse_submission_epoch(bad).unwrap_err();
      assert!(
        matches!(&err, Error::TimeFormat { value, .. } if value == bad),
        "unexpected error for {bad:?}: {err}"
      );
    }
  }

  #[test]
  fn feed_item_decodes_full_element() {
    let json = r#"{
      "phish_id": 123456,
      "url": "https://www.example.com/",
      "phish_detail_url": "http://www.phishtank.com/phish_detail.php?phish_id=123456",
      "submission_time": "2009-06-19T15:15:47+00:00",
      "verified": "yes",
      "verification_time": "2009-06-19T15:37:31+00:00",
      "online": "yes",
      "target": "1st National Example Bank",
      "details": [{
        "ip_address": "1.2.3.4",
        "cidr_block": "1.2.3.0/24",
        "announcing_network": "1234",
        "rir": "arin",
        "detail_time": "2006-10-01T02:30:54+00:00"
      }]
    }"#;

    let item: FeedItem = serde_json::from_str(json).unwrap();
    let record = PhishingRecord::from_item(item).unwrap();
    assert_eq!(record.phish_id, 123456);
    assert_eq!(record.submission_epoch, 1_245_424_547);
    assert_eq!(record.details.len(), 1);
    assert_eq!(record.details[0].rir, "arin");
  }

  #[test]
  fn missing_and_null_details_become_empty() {
    let missing: FeedItem = serde_json::from_str(
      r#"{"phish_id":1,"submission_time":"2020-01-01T00:00:00Z"}"#,
    )
    .unwrap();
    let null: FeedItem = serde_json::from_str(
      r#"{"phish_id":1,"submission_time":"2020-01-01T00:00:00Z","details":null}"#,
    )
    .unwrap();
    assert!(missing.details.is_empty());
    assert!(null.details.is_empty());
  }

  #[test]
  fn record_without_valid_time_is_not_built() {
    let item = FeedItem { phish_id: 7, submission_time: "n/a".into(), ..Default::default() };
    assert!(matches!(
      PhishingRecord::from_item(item),
      Err(Error::TimeFormat { .. })
    ));
  }
}
