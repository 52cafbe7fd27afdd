use std::future::Future;

use bytes::Bytes;

use crate::error::ArchiverResult;

/// Per-record result of a batch ingest call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryResult {
    Accepted { record_id: Option<String> },
    Failed { code: String, message: String },
}

/// Response of a batch ingest call.
///
/// `entries` is positionally aligned with the submitted records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkResponse {
    pub failed_put_count: usize,
    pub entries: Vec<EntryResult>,
}

/// Trait for append-only ingestion services receiving archived records.
///
/// A call either fails as a whole or returns one [`EntryResult`] per submitted record, in
/// submission order. Implementations report a missing endpoint with
/// [`crate::error::ErrorKind::SinkNotFound`] and any other call failure with
/// [`crate::error::ErrorKind::SinkCallFailed`].
pub trait Sink {
    /// Returns the name of the sink.
    fn name() -> &'static str;

    /// Checks that the sink exists before a run starts.
    ///
    /// The default implementation accepts every sink.
    fn validate(&self) -> impl Future<Output = ArchiverResult<()>> + Send {
        async { Ok(()) }
    }

    /// Maximum number of records accepted by a single [`Sink::put_batch`] call.
    fn max_batch_records(&self) -> usize;

    /// Submits `records` in one call, preserving their order.
    fn put_batch(
        &self,
        records: Vec<Bytes>,
    ) -> impl Future<Output = ArchiverResult<SinkResponse>> + Send;
}
