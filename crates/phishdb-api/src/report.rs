//! Handler for `GET /download_report`.
//!
//! Returns every URL submitted in `[from, to]` together with a histogram of
//! their top-level domains, as `{"URLs", "TotalResults", "SortedTLDs"}`.

use std::{collections::HashMap, sync::Arc};

use axum::{
  Json,
  extract::{Query, State},
};
use phishdb_core::store::RecordStore;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ApiError;

#[derive(Debug, Deserialize, Default)]
pub struct ReportParams {
  /// Start of the window, Unix seconds, inclusive. Required.
  pub from: Option<String>,
  /// End of the window, Unix seconds, inclusive. Defaults to now.
  pub to:   Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TldCount {
  #[serde(rename = "TLD")]
  pub tld:         String,
  pub occurrences: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Report {
  #[serde(rename = "URLs")]
  pub urls:          Vec<String>,
  pub total_results: usize,
  /// Most frequent first; ties broken by name.
  #[serde(rename = "SortedTLDs")]
  pub sorted_tlds:   Vec<TldCount>,
}

/// `GET /download_report?from=<epoch>[&to=<epoch>]`
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ReportParams>,
) -> Result<Json<Report>, ApiError>
where
  S: RecordStore,
{
  let from = match params.from.as_deref() {
    None | Some("") => return Err(ApiError::BadRequest("Missing 'from' parameter".into())),
    Some(raw) => raw
      .parse::<i64>()
      .map_err(|_| ApiError::BadRequest("Invalid 'from' parameter".into()))?,
  };
  let to = match params.to.as_deref() {
    None | Some("") => chrono::Utc::now().timestamp(),
    Some(raw) => raw
      .parse::<i64>()
      .map_err(|_| ApiError::BadRequest("Invalid 'to' parameter".into()))?,
  };

  let records = store
    .find_by_submission_range(from, to)
    .await
    .map_err(ApiError::store)?;

  let urls: Vec<String> = records.into_iter().map(|r| r.url).collect();
  tracing::debug!(from, to, results = urls.len(), "built report");

  Ok(Json(Report {
    total_results: urls.len(),
    sorted_tlds: tld_histogram(urls.as_slice()),
    urls,
  }))
}

/// Count top-level domains across `urls`, most frequent first.
pub fn tld_histogram<S: AsRef<str>>(urls: &[S]) -> Vec<TldCount> {
  let mut counts: HashMap<String, u64> = HashMap::new();
  for url in urls {
    match extract_tld(url.as_ref()) {
      Some(tld) => *counts.entry(tld).or_default() += 1,
      None => tracing::warn!(url = url.as_ref(), "could not extract TLD"),
    }
  }

  let mut sorted: Vec<TldCount> = counts
    .into_iter()
    .map(|(tld, occurrences)| TldCount { tld, occurrences })
    .collect();
  sorted.sort_by(|a, b| b.occurrences.cmp(&a.occurrences).then_with(|| a.tld.cmp(&b.tld)));
  sorted
}

/// The last label of the URL's host, if it is purely alphabetic.
///
/// IP literals and hosts without a dot have no TLD.
pub fn extract_tld(raw: &str) -> Option<String> {
  let url = Url::parse(raw).ok()?;
  let host = url.host_str()?.trim_end_matches('.');
  let (_, tld) = host.rsplit_once('.')?;
  if tld.is_empty() || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
    return None;
  }
  Some(tld.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tld_is_last_host_label() {
    assert_eq!(extract_tld("http://a.example.com/login").as_deref(), Some("com"));
    assert_eq!(extract_tld("https://Secure.Bank.CO.UK:8443/").as_deref(), Some("uk"));
    assert_eq!(extract_tld("http://example.org./").as_deref(), Some("org"));
  }

  #[test]
  fn hosts_without_alphabetic_tld_are_skipped() {
    assert_eq!(extract_tld("http://203.0.113.7/x"), None);
    assert_eq!(extract_tld("http://[2001:db8::1]/"), None);
    assert_eq!(extract_tld("http://localhost/"), None);
    assert_eq!(extract_tld("not a url"), None);
  }

  #[test]
  fn histogram_orders_by_count_then_name() {
    let urls = [
      "http://a.example.com",
      "http://b.example.net",
      "http://c.example.com",
      "http://d.example.org",
      "http://e.example.net",
      "http://f.example.com",
      "http://198.51.100.1/",
    ];
    let tlds: Vec<_> = tld_histogram(&urls)
      .into_iter()
      .map(|t| (t.tld, t.occurrences))
      .collect();
    assert_eq!(
      tlds,
      vec![("com".to_owned(), 3), ("net".to_owned(), 2), ("org".to_owned(), 1)]
    );
  }
}
