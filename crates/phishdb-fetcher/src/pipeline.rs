//! One ingest cycle: fetch the feed, decode it, and hand every record to the
//! store's replace transaction.
//!
//! The decoder runs in the calling task as the producer; the store's
//! [`RecordStore::replace_all`] runs in a spawned task as the consumer. They
//! meet on a bounded channel, so at most `handoff_capacity` records are in
//! flight regardless of feed size.

use std::{future::Future, io, sync::Arc, time::Duration};

use futures::TryStreamExt as _;
use phishdb_core::store::{RecordStore, ReplaceSummary};
use phishdb_feed::FeedDecoder;
use tokio::{io::AsyncRead, sync::mpsc, task::JoinHandle, time::Instant};
use tokio_util::{io::StreamReader, sync::CancellationToken};
use tracing::Instrument as _;

use crate::{Error, FetcherConfig, Result};

/// What a successful cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
  /// Records decoded from the feed.
  pub records:       u64,
  /// Records committed to the store.
  pub inserted:      u64,
  pub duplicate_ids: u64,
  pub elapsed:       Duration,
}

/// A unit of work the [`Scheduler`](crate::Scheduler) can run and retry.
pub trait IngestCycle: Send + Sync {
  /// Run one cycle. Implementations must stop promptly once `cancel` fires
  /// and leave the store as it was on any error.
  fn run<'a>(
    &'a self,
    cancel: &'a CancellationToken,
  ) -> impl Future<Output = Result<CycleSummary>> + Send + 'a;
}

type SinkHandle = JoinHandle<Result<ReplaceSummary>>;

/// How the producer loop ended.
enum Produced {
  /// The decoder ran out of records; the consumer is still running.
  Exhausted,
  /// The producer failed or was cancelled; the consumer is still running.
  Aborted(Error),
  /// The consumer finished on its own before the producer was done.
  SinkFinished(Result<ReplaceSummary>),
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Fetches the feed over HTTP and streams it into `S`.
pub struct Pipeline<S> {
  client:           reqwest::Client,
  feed_url:         String,
  handoff_capacity: usize,
  store:            Arc<S>,
}

impl<S> Pipeline<S>
where
  S: RecordStore + 'static,
{
  pub fn new(config: &FetcherConfig, store: Arc<S>) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(config.user_agent.clone())
      .build()
      .map_err(Error::Client)?;
    Ok(Self {
      client,
      feed_url: config.feed_url.clone(),
      handoff_capacity: config.handoff_capacity.max(1),
      store,
    })
  }

  /// Fetch the feed and atomically replace the store's contents with it.
  ///
  /// Any failure (network, decode, or store) yields a single error and leaves
  /// the previous snapshot in place. Cancelling `cancel` aborts the request,
  /// the decode loop and the store transaction.
  pub async fn fetch_and_process(&self, cancel: &CancellationToken) -> Result<CycleSummary> {
    let started = Instant::now();

    let response = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(Error::Cancelled),
      res = self.client.get(&self.feed_url).send() => res.map_err(|err| {
        tracing::error!(url = %self.feed_url, error = %err, "error fetching feed");
        Error::Transport(err)
      })?,
    };

    let status = response.status();
    if !status.is_success() {
      return Err(Error::UnexpectedStatus(status));
    }

    let body = StreamReader::new(response.bytes_stream().map_err(io::Error::other));
    let mut decoder = FeedDecoder::new(Box::pin(body));
    tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(Error::Cancelled),
      res = decoder.open() => res?,
    }

    let (tx, rx) = mpsc::channel(self.handoff_capacity);
    let sink_cancel = cancel.child_token();
    // Rolls the transaction back if this future is dropped mid-cycle.
    let rollback_on_drop = sink_cancel.clone().drop_guard();

    let mut sink: SinkHandle = tokio::spawn(
      {
        let store = Arc::clone(&self.store);
        let sink_cancel = sink_cancel.clone();
        async move {
          store
            .replace_all(rx, sink_cancel)
            .await
            .map_err(|err| Error::Sink(Box::new(err)))
        }
      }
      .in_current_span(),
    );

    let produced = produce(&mut decoder, &tx, &mut sink, cancel).await;
    let summary = match produced {
      Produced::Exhausted => {
        tracing::info!(records = decoder.decoded(), "pushed all records for processing");
        drop(tx);
        flatten(sink.await)?
      }
      Produced::Aborted(err) => {
        sink_cancel.cancel();
        drop(tx);
        // Wait for the rollback so the consumer never outlives the cycle.
        match sink.await {
          Ok(Err(sink_err)) => tracing::debug!(error = %sink_err, "sink rolled back"),
          Ok(Ok(_)) => tracing::warn!("sink committed after producer failure"),
          Err(join_err) => tracing::warn!(error = %join_err, "sink task failed"),
        }
        return Err(err);
      }
      Produced::SinkFinished(Ok(_)) => return Err(Error::SinkExitedEarly),
      Produced::SinkFinished(Err(err)) => return Err(err),
    };
    rollback_on_drop.disarm();

    Ok(CycleSummary {
      records:       decoder.decoded(),
      inserted:      summary.inserted,
      duplicate_ids: summary.duplicate_ids,
      elapsed:       started.elapsed(),
    })
  }
}

impl<S> IngestCycle for Pipeline<S>
where
  S: RecordStore + 'static,
{
  async fn run(&self, cancel: &CancellationToken) -> Result<CycleSummary> {
    self.fetch_and_process(cancel).await
  }
}

// ─── Producer ────────────────────────────────────────────────────────────────

/// Decode records and push them to the consumer until the feed runs out.
///
/// Cancellation and early consumer completion are checked before every
/// decode and every send, and take precedence over both.
async fn produce<R>(
  decoder: &mut FeedDecoder<R>,
  tx: &mpsc::Sender<phishdb_core::record::PhishingRecord>,
  sink: &mut SinkHandle,
  cancel: &CancellationToken,
) -> Produced
where
  R: AsyncRead + Unpin,
{
  loop {
    let next = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Produced::Aborted(Error::Cancelled),
      res = &mut *sink => return Produced::SinkFinished(flatten(res)),
      next = decoder.next_record() => next,
    };

    let record = match next {
      Ok(Some(record)) => record,
      Ok(None) => return Produced::Exhausted,
      Err(err) => return Produced::Aborted(err.into()),
    };
    let phish_id = record.phish_id;

    tokio::select! {
      biased;
      _ = cancel.cancelled() => return Produced::Aborted(Error::Cancelled),
      res = &mut *sink => return Produced::SinkFinished(flatten(res)),
      sent = tx.send(record) => {
        if sent.is_err() {
          // The receiver is gone, so the consumer has already stopped.
          return Produced::SinkFinished(flatten((&mut *sink).await));
        }
      }
    }
    tracing::trace!(phish_id, "pushed record");
  }
}

fn flatten<T>(joined: Result<Result<T>, tokio::task::JoinError>) -> Result<T> { joined? }
