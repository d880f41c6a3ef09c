//! Handler for `GET /search_domain`.
//!
//! Matches are written as newline-delimited JSON, one [`SearchHit`] per line.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  http::header,
  response::IntoResponse,
};
use phishdb_core::{record::PhishingRecord, store::RecordStore};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
  /// Substring to look for in record URLs, matched case-insensitively.
  pub domain: Option<String>,
}

/// One matching record on the wire. Network details are not included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchHit {
  #[serde(rename = "PhishID")]
  pub phish_id:             i64,
  #[serde(rename = "URL")]
  pub url:                  String,
  #[serde(rename = "PhishDetailURL")]
  pub phish_detail_url:     String,
  pub submission_time:      String,
  pub submission_time_unix: i64,
  pub verified:             String,
  pub verification_time:    String,
  pub online:               String,
  pub target:               String,
}

impl From<PhishingRecord> for SearchHit {
  fn from(r: PhishingRecord) -> Self {
    Self {
      phish_id:             r.phish_id,
      url:                  r.url,
      phish_detail_url:     r.phish_detail_url,
      submission_time:      r.submission_time,
      submission_time_unix: r.submission_epoch,
      verified:             r.verified,
      verification_time:    r.verification_time,
      online:               r.online,
      target:               r.target,
    }
  }
}

/// `GET /search_domain?domain=<text>`
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
{
  let domain = params
    .domain
    .filter(|d| !d.trim().is_empty())
    .ok_or_else(|| ApiError::BadRequest("Missing 'domain' parameter".into()))?;

  let records = store.search_url(domain.trim()).await.map_err(ApiError::store)?;
  tracing::debug!(domain = domain.trim(), results = records.len(), "searched domain");

  let mut body = Vec::new();
  for record in records {
    serde_json::to_writer(&mut body, &SearchHit::from(record))?;
    body.push(b'\n');
  }
  Ok(([(header::CONTENT_TYPE, "application/json")], body))
}
