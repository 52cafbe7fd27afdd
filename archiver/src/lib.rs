//! Batched transfer-and-purge of records from a paginated source store into an
//! append-only sink.
//!
//! A drain run pages through the source, projects every record into a fixed-shape payload,
//! ships payloads to the sink in bounded batches and deletes from the source only those
//! records the sink confirmed. The [`archive`] module reuses the same projection and sink
//! path for change events whose records were already removed upstream.

pub mod archive;
pub mod conversions;
pub mod drain;
pub mod error;
mod macros;
pub mod sink;
pub mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
