//! Streaming decoder for the phishing feed.
//!
//! The feed is one large JSON array of report objects. [`FeedDecoder`] reads
//! it from any [`tokio::io::AsyncRead`] and yields one
//! [`PhishingRecord`](phishdb_core::record::PhishingRecord) at a time; only the
//! element currently being decoded is held in memory.
//!
//! ```no_run
//! # async fn demo() -> phishdb_feed::Result<()> {
//! let body: &[u8] = br#"[{"phish_id":1,"submission_time":"2020-01-01T00:00:00Z"}]"#;
//! let mut decoder = phishdb_feed::FeedDecoder::new(body);
//! decoder.open().await?;
//! while let Some(record) = decoder.next_record().await? {
//!   println!("{} -> {}", record.phish_id, record.submission_epoch);
//! }
//! # Ok(())
//! # }
//! ```

mod decode;
pub mod error;
mod scan;

pub use decode::FeedDecoder;
pub use error::{Error, Result};
