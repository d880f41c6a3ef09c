//! Periodic ingest of the phishing feed.
//!
//! [`Pipeline`] runs one fetch → decode → replace cycle; [`Scheduler`] wraps
//! it with a per-attempt deadline, a bounded retry loop and a fixed-period
//! ticker.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod scheduler;

pub use config::FetcherConfig;
pub use error::{Error, Result};
pub use pipeline::{CycleSummary, IngestCycle, Pipeline};
pub use scheduler::{Scheduler, TickOutcome};
