//! Core types and trait definitions for the phishdb ingest pipeline.
//!
//! This crate has no HTTP or database dependencies. The feed codec, the
//! storage backend and the HTTP layers all depend on it.

pub mod error;
pub mod record;
pub mod store;

pub use error::{Error, Result};
