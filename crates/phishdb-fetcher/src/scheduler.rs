//! The retry/schedule controller.
//!
//! ```text
//! Idle ──tick──▶ Running(1) ──ok──▶ Idle
//!                    │
//!                   err
//!                    ▼
//!               BackoffWait ──▶ Running(n + 1)   while n ≤ retry_limit
//!                    │
//!                 exhausted ──▶ Idle
//! ```
//!
//! Cycles run strictly one after another; a cycle that overruns the period
//! delays the next tick instead of overlapping it.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument as _;
use uuid::Uuid;

use crate::{CycleSummary, Error, FetcherConfig, IngestCycle, Result};

/// How one tick ended.
#[derive(Debug)]
pub enum TickOutcome {
  Succeeded { attempts: u32, summary: CycleSummary },
  Exhausted { attempts: u32, last_error: Error },
}

impl TickOutcome {
  pub fn attempts(&self) -> u32 {
    match self {
      TickOutcome::Succeeded { attempts, .. } | TickOutcome::Exhausted { attempts, .. } => {
        *attempts
      }
    }
  }

  pub fn is_success(&self) -> bool { matches!(self, TickOutcome::Succeeded { .. }) }
}

/// Drives an [`IngestCycle`] on a fixed period with bounded retries.
pub struct Scheduler<C> {
  cycle:           C,
  fetch_period:    Duration,
  retry_limit:     u32,
  attempt_timeout: Duration,
  retry_backoff:   Duration,
}

impl<C: IngestCycle> Scheduler<C> {
  pub fn new(config: &FetcherConfig, cycle: C) -> Self {
    Self {
      cycle,
      fetch_period: config.fetch_period(),
      retry_limit: config.retry_limit,
      attempt_timeout: config.attempt_timeout(),
      retry_backoff: config.retry_backoff(),
    }
  }

  /// Tick forever until `shutdown` fires. The first tick is immediate.
  pub async fn run(&self, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(self.fetch_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(period = ?self.fetch_period, "fetcher started");

    loop {
      tokio::select! {
        biased;
        _ = shutdown.cancelled() => break,
        _ = ticker.tick() => {}
      }

      // Dropping an in-flight tick rolls its transaction back.
      let outcome = tokio::select! {
        biased;
        _ = shutdown.cancelled() => break,
        outcome = self.run_tick() => outcome,
      };
      if let TickOutcome::Exhausted { attempts, last_error } = &outcome {
        tracing::error!(attempts, error = %last_error, "giving up until next tick");
      }
    }

    tracing::info!("fetcher stopped");
  }

  /// Run one tick: the initial attempt plus up to `retry_limit` retries.
  pub async fn run_tick(&self) -> TickOutcome {
    let mut attempt = 0u32;
    loop {
      attempt += 1;
      let span = tracing::info_span!("cycle", id = %Uuid::new_v4(), attempt);

      match self.run_attempt().instrument(span).await {
        Ok(summary) => {
          tracing::info!(
            attempt,
            records = summary.records,
            elapsed = ?summary.elapsed,
            "ingest cycle completed"
          );
          return TickOutcome::Succeeded { attempts: attempt, summary };
        }
        Err(err) => {
          tracing::error!(attempt, error = %err, "error fetching and processing feed");
          if attempt > self.retry_limit {
            tracing::error!(retries = self.retry_limit, "retry limit reached");
            return TickOutcome::Exhausted { attempts: attempt, last_error: err };
          }
          tokio::time::sleep(self.retry_backoff).await;
        }
      }
    }
  }

  /// Run a single attempt under the per-attempt deadline.
  ///
  /// When the deadline passes the attempt is cancelled and then awaited, so
  /// it can roll back before this returns.
  async fn run_attempt(&self) -> Result<CycleSummary> {
    let cancel = CancellationToken::new();
    let attempt = self.cycle.run(&cancel);
    tokio::pin!(attempt);

    let mut timed_out = false;
    let result = tokio::select! {
      res = &mut attempt => res,
      _ = tokio::time::sleep(self.attempt_timeout) => {
        timed_out = true;
        cancel.cancel();
        attempt.await
      }
    };

    match result {
      Err(err) if timed_out => {
        tracing::debug!(error = %err, "attempt stopped at deadline");
        Err(Error::Timeout(self.attempt_timeout))
      }
      other => other,
    }
  }
}
