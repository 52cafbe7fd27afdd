//! Sink abstractions.
//!
//! A [`Sink`] is the append-only ingestion endpoint receiving projected records. The
//! [`memory::MemorySink`] implementation records deliveries in memory for tests.

mod base;
pub mod memory;

pub use base::{EntryResult, Sink, SinkResponse};
