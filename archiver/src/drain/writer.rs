use bytes::Bytes;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::archiver_error;
use crate::bail;
use crate::error::{ArchiverResult, ErrorKind};
use crate::sink::{EntryResult, Sink};
use crate::types::{Outcome, OutcomeList};

/// Encodes a payload as one UTF-8 JSON line.
pub fn encode_record<P>(payload: &P) -> ArchiverResult<Bytes>
where
    P: Serialize + ?Sized,
{
    let mut encoded = serde_json::to_vec(payload).map_err(|err| {
        archiver_error!(
            ErrorKind::SerializationError,
            "Payload serialization failed",
            err.to_string(),
            source: err
        )
    })?;
    encoded.push(b'\n');

    Ok(Bytes::from(encoded))
}

/// Submits batches to a [`Sink`] and turns its responses into positional outcomes.
#[derive(Debug, Clone)]
pub struct SinkWriter<K> {
    sink: K,
}

impl<K> SinkWriter<K>
where
    K: Sink,
{
    pub fn new(sink: K) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Sends one batch, degrading a failed call to an all-rejected outcome list.
    ///
    /// Only errors that end a run, such as a missing sink, are returned. Any other call
    /// failure is logged and every record of the batch is reported as rejected, so none of
    /// them is purged.
    pub async fn send(&self, records: Vec<Bytes>) -> ArchiverResult<OutcomeList> {
        let size = records.len();

        match self.submit(records).await {
            Ok(outcomes) => Ok(outcomes),
            Err(err) if err.halts_run() => Err(err),
            Err(err) => {
                let reason = err
                    .detail()
                    .or(err.description())
                    .unwrap_or("sink call failed")
                    .to_string();
                error!(
                    sink = K::name(),
                    size,
                    kind = ?err.kind(),
                    %reason,
                    "sink call failed, no record of this batch will be purged"
                );

                Ok(vec![Outcome::Rejected(reason); size])
            }
        }
    }

    /// Submits one batch and returns the outcomes, propagating every call failure.
    pub async fn submit(&self, records: Vec<Bytes>) -> ArchiverResult<OutcomeList> {
        let size = records.len();
        if size == 0 {
            return Ok(Vec::new());
        }

        let limit = self.sink.max_batch_records();
        if size > limit {
            bail!(
                ErrorKind::InvalidState,
                "Batch exceeds the sink record limit",
                format!("{size} records submitted, the sink accepts at most {limit}")
            );
        }

        let response = self.sink.put_batch(records).await?;

        let failed_entries = response
            .entries
            .iter()
            .filter(|entry| matches!(entry, EntryResult::Failed { .. }))
            .count();
        if failed_entries != response.failed_put_count {
            warn!(
                sink = K::name(),
                failed_put_count = response.failed_put_count,
                failed_entries,
                "sink failed count disagrees with its per-record results"
            );
        }

        info!(
            sink = K::name(),
            size,
            failed = failed_entries,
            "sent batch to sink"
        );

        Ok(response
            .entries
            .into_iter()
            .map(|entry| match entry {
                EntryResult::Accepted { .. } => Outcome::Delivered,
                EntryResult::Failed { code, message } => {
                    Outcome::Rejected(format!("{code}: {message}"))
                }
            })
            .collect())
    }
}
