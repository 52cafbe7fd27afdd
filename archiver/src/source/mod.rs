//! Source store abstractions.
//!
//! A [`SourceStore`] is the paginated, key-addressable store a drain run empties. The
//! [`memory::MemorySource`] implementation keeps records in memory for tests and local runs.

mod base;
pub mod memory;

pub use base::{DeleteFailure, DeleteOutcome, Page, SourceStore};
