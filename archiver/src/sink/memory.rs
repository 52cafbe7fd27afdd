use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::info;

use crate::bail;
use crate::error::{ArchiverResult, ErrorKind};
use crate::sink::{EntryResult, Sink, SinkResponse};

/// Per-call record limit of the in-memory sink, matching the reference delivery stream.
pub const MEMORY_SINK_MAX_BATCH_RECORDS: usize = 500;

/// Error code reported for injected per-record rejections.
pub const INJECTED_REJECTION_CODE: &str = "ServiceUnavailableException";

#[derive(Debug, Default)]
struct Inner {
    delivered: Vec<Bytes>,
    batch_sizes: Vec<usize>,
    calls: usize,
    rejections: HashMap<usize, HashSet<usize>>,
    failing_calls: HashSet<usize>,
    short_calls: HashSet<usize>,
    missing: bool,
}

/// In-memory sink for tests and local experiments.
///
/// Accepted records are kept in delivery order. Calls are numbered from 1 over the lifetime of
/// the sink, and failures can be injected per call or per record within a call.
#[derive(Debug, Clone)]
pub struct MemorySink {
    inner: Arc<Mutex<Inner>>,
    max_batch_records: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_max_batch_records(MEMORY_SINK_MAX_BATCH_RECORDS)
    }

    pub fn with_max_batch_records(max_batch_records: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            max_batch_records,
        }
    }

    /// Returns a copy of every accepted record, in delivery order.
    pub async fn delivered(&self) -> Vec<Bytes> {
        self.inner.lock().await.delivered.clone()
    }

    /// Returns the size of every submitted batch, including failed calls.
    pub async fn batch_sizes(&self) -> Vec<usize> {
        self.inner.lock().await.batch_sizes.clone()
    }

    /// Returns the number of `put_batch` calls received so far.
    pub async fn calls(&self) -> usize {
        self.inner.lock().await.calls
    }

    /// Rejects the record at `index` of the `call`-th batch.
    pub async fn reject_entry(&self, call: usize, index: usize) {
        self.inner
            .lock()
            .await
            .rejections
            .entry(call)
            .or_default()
            .insert(index);
    }

    /// Fails the `call`-th batch as a whole.
    pub async fn fail_call(&self, call: usize) {
        self.inner.lock().await.failing_calls.insert(call);
    }

    /// Makes the `call`-th response carry one entry less than the submitted batch.
    pub async fn truncate_response(&self, call: usize) {
        self.inner.lock().await.short_calls.insert(call);
    }

    /// Makes the sink behave as if it did not exist.
    pub async fn set_missing(&self, missing: bool) {
        self.inner.lock().await.missing = missing;
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for MemorySink {
    fn name() -> &'static str {
        "memory"
    }

    async fn validate(&self) -> ArchiverResult<()> {
        if self.inner.lock().await.missing {
            bail!(ErrorKind::SinkNotFound, "Memory sink does not exist");
        }

        Ok(())
    }

    fn max_batch_records(&self) -> usize {
        self.max_batch_records
    }

    async fn put_batch(&self, records: Vec<Bytes>) -> ArchiverResult<SinkResponse> {
        let mut inner = self.inner.lock().await;
        if inner.missing {
            bail!(ErrorKind::SinkNotFound, "Memory sink does not exist");
        }

        inner.calls += 1;
        let call = inner.calls;
        inner.batch_sizes.push(records.len());

        if inner.failing_calls.contains(&call) {
            bail!(
                ErrorKind::SinkCallFailed,
                "Memory sink call failed",
                format!("injected failure on call {call}")
            );
        }

        if records.len() > self.max_batch_records {
            bail!(
                ErrorKind::SinkCallFailed,
                "Memory sink batch exceeds the record limit",
                format!("{} > {}", records.len(), self.max_batch_records)
            );
        }

        let rejected = inner.rejections.get(&call).cloned().unwrap_or_default();
        let mut response = SinkResponse {
            failed_put_count: 0,
            entries: Vec::with_capacity(records.len()),
        };

        let mut accepted = 0;
        for (index, record) in records.into_iter().enumerate() {
            if rejected.contains(&index) {
                response.failed_put_count += 1;
                response.entries.push(EntryResult::Failed {
                    code: INJECTED_REJECTION_CODE.to_string(),
                    message: format!("injected rejection of entry {index}"),
                });
                continue;
            }

            accepted += 1;
            inner.delivered.push(record);
            response.entries.push(EntryResult::Accepted {
                record_id: Some(format!("{call}-{index}")),
            });
        }

        if inner.short_calls.contains(&call) {
            response.entries.pop();
        }

        info!(
            call,
            accepted,
            failed = response.failed_put_count,
            "memory sink received batch"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(count: usize) -> Vec<Bytes> {
        (0..count)
            .map(|index| Bytes::from(format!("{index}\n")))
            .collect()
    }

    #[tokio::test]
    async fn rejects_only_injected_entries() {
        let sink = MemorySink::new();
        sink.reject_entry(1, 1).await;

        let response = sink.put_batch(records(3)).await.unwrap();

        assert_eq!(response.failed_put_count, 1);
        assert!(matches!(response.entries[1], EntryResult::Failed { .. }));
        let sent = records(3);
        assert_eq!(sink.delivered().await, vec![sent[0].clone(), sent[2].clone()]);
    }

    #[tokio::test]
    async fn failed_call_delivers_nothing() {
        let sink = MemorySink::new();
        sink.fail_call(1).await;

        let err = sink.put_batch(records(2)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SinkCallFailed);
        assert!(sink.delivered().await.is_empty());
        assert_eq!(sink.batch_sizes().await, vec![2]);
    }
}
