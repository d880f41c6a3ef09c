//! [`FeedDecoder`]: incremental decoding of the top-level feed array.
//!
//! Pipeline:
//!   AsyncRead
//!     └─ fill()                 → BytesMut (one element + one read chunk)
//!          └─ ElementScanner     → byte range of the next element
//!               └─ serde_json    → FeedItem
//!                    └─ from_item → PhishingRecord

use bytes::{Buf, BytesMut};
use phishdb_core::record::{FeedItem, PhishingRecord};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
  error::{Error, Result},
  scan::ElementScanner,
};

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
  /// The opening `[` has not been consumed yet.
  Unopened,
  /// Inside the array, before the first element.
  First,
  /// Inside the array, after at least one element.
  Next,
  /// Exhausted or failed; every further call yields `None`.
  Done,
}

/// A lazy, single-pass decoder over a JSON array of feed items.
pub struct FeedDecoder<R> {
  reader:  R,
  buf:     BytesMut,
  scanner: ElementScanner,
  state:   State,
  decoded: u64,
}

impl<R: AsyncRead + Unpin> FeedDecoder<R> {
  pub fn new(reader: R) -> Self {
    Self {
      reader,
      buf: BytesMut::with_capacity(READ_CHUNK),
      scanner: ElementScanner::default(),
      state: State::Unopened,
      decoded: 0,
    }
  }

  /// Number of records yielded so far.
  pub fn decoded(&self) -> u64 { self.decoded }

  /// Consume the opening `[` of the feed.
  ///
  /// Fails with [`Error::MalformedFeed`] if the body is empty or starts with
  /// anything other than an array.
  pub async fn open(&mut self) -> Result<()> {
    if self.state != State::Unopened {
      return Ok(());
    }
    match self.peek_non_ws().await? {
      Some(b'[') => {
        self.buf.advance(1);
        self.state = State::First;
        Ok(())
      }
      Some(other) => {
        self.state = State::Done;
        Err(Error::MalformedFeed(format!(
          "expected '[' at start of body, found {:?}",
          char::from(other)
        )))
      }
      None => {
        self.state = State::Done;
        Err(Error::MalformedFeed("empty body".to_owned()))
      }
    }
  }

  /// Decode the next record.
  ///
  /// Returns `Ok(None)` once the array is exhausted. A missing or invalid
  /// terminator after a complete element is logged as a warning and also
  /// ends the sequence with `Ok(None)`. Any element that fails to decode is
  /// an error, after which the decoder yields nothing more.
  pub async fn next_record(&mut self) -> Result<Option<PhishingRecord>> {
    let result = self.advance().await;
    if !matches!(result, Ok(Some(_))) {
      self.state = State::Done;
    }
    result
  }

  async fn advance(&mut self) -> Result<Option<PhishingRecord>> {
    match self.state {
      State::Done => return Ok(None),
      State::Unopened => self.open().await?,
      State::First | State::Next => {}
    }

    match self.peek_non_ws().await? {
      None => {
        self.warn_trailing("body ended before closing ']'");
        return Ok(None);
      }
      Some(b']') => {
        self.buf.advance(1);
        self.finish();
        return Ok(None);
      }
      Some(b',') if self.state == State::Next => {
        self.buf.advance(1);
        match self.peek_non_ws().await? {
          None => {
            self.warn_trailing("body ended after ','");
            return Ok(None);
          }
          Some(b']') => {
            self.warn_trailing("trailing ',' before closing ']'");
            self.buf.advance(1);
            self.finish();
            return Ok(None);
          }
          Some(_) => {}
        }
      }
      Some(other) if self.state == State::Next => {
        self.warn_trailing(&format!(
          "expected ',' or ']' after element, found {:?}",
          char::from(other)
        ));
        return Ok(None);
      }
      Some(_) => {}
    }

    let record = self.decode_element().await?;
    self.state = State::Next;
    self.decoded += 1;
    Ok(Some(record))
  }

  /// Decode the element that starts at the front of the buffer.
  async fn decode_element(&mut self) -> Result<PhishingRecord> {
    self.scanner.reset();
    let item: FeedItem = loop {
      if let Some(end) = self.scanner.feed(&self.buf) {
        let element = self.buf.split_to(end);
        break serde_json::from_slice(&element)?;
      }
      if self.fill().await? == 0 {
        // Let serde_json describe what is missing from the truncated element.
        let element = self.buf.split();
        break serde_json::from_slice(&element)?;
      }
    };
    Ok(PhishingRecord::from_item(item)?)
  }

  /// Warn about non-whitespace already buffered after the closing `]`. The
  /// rest of the body is never read.
  fn finish(&mut self) {
    if self.buf.iter().any(|b| !b.is_ascii_whitespace()) {
      self.warn_trailing("unexpected data after closing ']'");
    }
    self.buf.clear();
  }

  fn warn_trailing(&self, reason: &str) {
    tracing::warn!(decoded = self.decoded, reason, "malformed end of feed array");
  }

  /// Skip whitespace and return the next byte without consuming it, reading
  /// more input as needed. `None` means end of input.
  async fn peek_non_ws(&mut self) -> Result<Option<u8>> {
    loop {
      let ws = self.buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
      self.buf.advance(ws);
      if let Some(&b) = self.buf.first() {
        return Ok(Some(b));
      }
      if self.fill().await? == 0 {
        return Ok(None);
      }
    }
  }

  async fn fill(&mut self) -> Result<usize> {
    self.buf.reserve(READ_CHUNK);
    let mut chunk = (&mut self.reader).take(READ_CHUNK as u64);
    Ok(chunk.read_buf(&mut self.buf).await?)
  }
}

#[cfg(test)]
mod tests {
  use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
  };

  use tokio::io::ReadBuf;

  use super::*;

  /// Hands out the input one byte per read to exercise every split point.
  struct Trickle<'a>(&'a [u8]);

  impl AsyncRead for Trickle<'_> {
    fn poll_read(
      mut self: Pin<&mut Self>,
      _cx: &mut Context<'_>,
      buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
      if buf.remaining() == 0 {
        return Poll::Ready(Ok(()));
      }
      let data = self.0;
      if let Some((first, rest)) = data.split_first() {
        buf.put_slice(&[*first]);
        self.0 = rest;
      }
      Poll::Ready(Ok(()))
    }
  }

  fn item(id: i64, time: &str) -> String {
    format!(
      r#"{{"phish_id":{id},"url":"http://host{id}.example.com/login","phish_detail_url":"http://www.phishtank.com/phish_detail.php?phish_id={id}","submission_time":"{time}","verified":"yes","verification_time":"{time}","online":"yes","target":"Other","details":[{{"ip_address":"1.2.3.4","cidr_block":"1.2.3.0/24","announcing_network":"1234","rir":"arin","detail_time":"{time}"}}]}}"#
    )
  }

  async fn collect<R: AsyncRead + Unpin>(
    mut decoder: FeedDecoder<R>,
  ) -> Result<Vec<PhishingRecord>> {
    decoder.open().await?;
    let mut out = Vec::new();
    while let Some(record) = decoder.next_record().await? {
      out.push(record);
    }
    Ok(out)
  }

  #[tokio::test]
  async fn decodes_example_feed() {
    let body = format!(
      "[{}, {}]",
      item(1, "2020-01-01T00:00:00Z"),
      item(2, "2021-06-01T12:30:00+02:00")
    );
    let records = collect(FeedDecoder::new(body.as_bytes())).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].phish_id, 1);
    assert_eq!(records[0].submission_epoch, 1_577_836_800);
    assert_eq!(records[1].phish_id, 2);
    assert_eq!(records[1].details[0].cidr_block, "1.2.3.0/24");
  }

  #[tokio::test]
  async fn decodes_when_bytes_arrive_one_at_a_time() {
    let body = format!(
      " \n[ {} ,\n{} ]\n",
      item(10, "2020-01-01T00:00:00Z"),
      item(11, "2020-01-02T00:00:00Z")
    );
    let records = collect(FeedDecoder::new(Trickle(body.as_bytes()))).await.unwrap();
    let ids: Vec<_> = records.iter().map(|r| r.phish_id).collect();
    assert_eq!(ids, vec![10, 11]);
  }

  #[tokio::test]
  async fn empty_array_yields_nothing() {
    let records = collect(FeedDecoder::new(&b"[]"[..])).await.unwrap();
    assert!(records.is_empty());
  }

  #[tokio::test]
  async fn missing_open_bracket_is_malformed() {
    let body = item(1, "2020-01-01T00:00:00Z");
    let mut decoder = FeedDecoder::new(body.as_bytes());
    assert!(matches!(decoder.open().await, Err(Error::MalformedFeed(_))));
    assert!(decoder.next_record().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn empty_body_is_malformed() {
    let mut decoder = FeedDecoder::new(&b"  \n"[..]);
    assert!(matches!(decoder.open().await, Err(Error::MalformedFeed(_))));
  }

  #[tokio::test]
  async fn next_record_opens_implicitly() {
    let body = format!("[{}]", item(5, "2020-01-01T00:00:00Z"));
    let mut decoder = FeedDecoder::new(body.as_bytes());
    let record = decoder.next_record().await.unwrap().unwrap();
    assert_eq!(record.phish_id, 5);
    assert!(decoder.next_record().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn missing_close_bracket_is_tolerated() {
    let body = format!(
      "[{},{}",
      item(1, "2020-01-01T00:00:00Z"),
      item(2, "2020-01-01T00:00:00Z")
    );
    let records = collect(FeedDecoder::new(body.as_bytes())).await.unwrap();
    assert_eq!(records.len(), 2);
  }

  #[tokio::test]
  async fn garbage_terminator_is_tolerated() {
    let body = format!("[{}}}", item(1, "2020-01-01T00:00:00Z"));
    let records = collect(FeedDecoder::new(body.as_bytes())).await.unwrap();
    assert_eq!(records.len(), 1);

    let body = format!("[{},]", item(1, "2020-01-01T00:00:00Z"));
    let records = collect(FeedDecoder::new(body.as_bytes())).await.unwrap();
    assert_eq!(records.len(), 1);

    let body = format!("[{}] trailing", item(1, "2020-01-01T00:00:00Z"));
    let records = collect(FeedDecoder::new(body.as_bytes())).await.unwrap();
    assert_eq!(records.len(), 1);
  }

  #[tokio::test]
  async fn ends_at_closing_bracket_without_waiting_for_eof() {
    let body = format!("[{}]\n", item(1, "2020-01-01T00:00:00Z"));
    // The writer half stays alive, so the reader never sees EOF.
    let (mut writer, reader) = tokio::io::duplex(64 * 1024);
    tokio::io::AsyncWriteExt::write_all(&mut writer, body.as_bytes())
      .await
      .unwrap();

    let records = tokio::time::timeout(
      std::time::Duration::from_secs(5),
      collect(FeedDecoder::new(reader)),
    )
    .await
    .expect("decoder waited for the body to close")
    .unwrap();
    assert_eq!(records.len(), 1);
    drop(writer);
  }

  #[tokio::test]
  async fn truncated_element_is_a_decode_error() {
    let full = item(2, "2020-01-01T00:00:00Z");
    let body = format!("[{},{}", item(1, "2020-01-01T00:00:00Z"), &full[..full.len() / 2]);
    let mut decoder = FeedDecoder::new(body.as_bytes());
    assert_eq!(decoder.next_record().await.unwrap().unwrap().phish_id, 1);
    assert!(matches!(decoder.next_record().await, Err(Error::Decode(_))));
    assert!(decoder.next_record().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn wrong_shape_element_is_a_decode_error() {
    let body = format!(r#"[{},{{"phish_id":"abc"}}]"#, item(1, "2020-01-01T00:00:00Z"));
    let err = collect(FeedDecoder::new(body.as_bytes())).await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));

    let err = collect(FeedDecoder::new(&b"[1,2]"[..])).await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
  }

  #[tokio::test]
  async fn bad_submission_time_aborts_the_feed() {
    let body = format!(
      "[{},{},{}]",
      item(1, "2020-01-01T00:00:00Z"),
      item(2, "last tuesday"),
      item(3, "2020-01-01T00:00:00Z")
    );
    let err = collect(FeedDecoder::new(body.as_bytes())).await.unwrap_err();
    assert!(matches!(
      err,
      Error::Record(phishdb_core::Error::TimeFormat { .. })
    ));
  }

  #[tokio::test]
  async fn buffer_stays_bounded_on_large_feeds() {
    let mut body = String::from("[");
    for id in 0..2_000 {
      if id > 0 {
        body.push(',');
      }
      body.push_str(&item(id, "2020-01-01T00:00:00Z"));
    }
    body.push(']');

    let one = item(9_999, "2020-01-01T00:00:00Z").len();
    let mut decoder = FeedDecoder::new(body.as_bytes());
    decoder.open().await.unwrap();
    let mut high_water = 0;
    while decoder.next_record().await.unwrap().is_some() {
      high_water = high_water.max(decoder.buf.len());
    }
    assert_eq!(decoder.decoded(), 2_000);
    assert!(high_water <= READ_CHUNK + one, "buffered {high_water} bytes");
  }
}
