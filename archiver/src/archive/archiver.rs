use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::archive::event::{StreamEvent, StreamEventBatch, image_to_record, table_name_from_arn};
use crate::archive::timestamp::TimestampMapper;
use crate::drain::{BatchAccumulator, SinkWriter, encode_record, ensure_aligned, normalize_record};
use crate::error::ArchiverResult;
use crate::sink::Sink;
use crate::types::{Batch, Outcome};

/// Payload shipped for every archived record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchivePayload {
    pub table: String,
    pub data: serde_json::Value,
    pub timestamp: String,
}

/// Tallies of one change-event document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Events in the document.
    pub received: u64,
    /// Events that are not time-to-live removals.
    pub ignored: u64,
    /// Time-to-live removals that could not be archived.
    pub skipped: u64,
    /// Records the sink confirmed.
    pub archived: u64,
    /// Records the sink rejected.
    pub rejected: u64,
}

/// Ships records removed by time-to-live expiry to a sink.
#[derive(Debug)]
pub struct Archiver<K> {
    writer: SinkWriter<K>,
    mapper: TimestampMapper,
    batch_size: usize,
}

impl<K> Archiver<K>
where
    K: Sink,
{
    /// Creates an archiver sending batches as large as the sink accepts.
    pub fn new(sink: K, mapper: TimestampMapper) -> Self {
        let batch_size = sink.max_batch_records();
        Self {
            writer: SinkWriter::new(sink),
            mapper,
            batch_size,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn sink(&self) -> &K {
        self.writer.sink()
    }

    /// Parses a change-event document and archives it.
    pub async fn archive_json(&self, document: &[u8]) -> ArchiverResult<ArchiveReport> {
        let batch: StreamEventBatch = serde_json::from_slice(document)?;
        self.archive(batch).await
    }

    /// Archives the time-to-live removals of `batch`.
    ///
    /// A failed sink call is returned as an error so the event source can redeliver the whole
    /// document. Rejected records are logged and counted.
    pub async fn archive(&self, batch: StreamEventBatch) -> ArchiverResult<ArchiveReport> {
        let mut report = ArchiveReport::default();
        let mut accumulator = BatchAccumulator::new(self.batch_size)?;

        for event in batch.records {
            report.received += 1;
            if !event.is_ttl_removal() {
                report.ignored += 1;
                continue;
            }

            let Some(payload) = self.payload(event) else {
                report.skipped += 1;
                continue;
            };

            if let Some(batch) = accumulator.push(encode_record(&payload)?) {
                self.ship(batch, &mut report).await?;
            }
        }

        if let Some(batch) = accumulator.finish() {
            self.ship(batch, &mut report).await?;
        }

        if report.archived + report.rejected == 0 {
            info!(received = report.received, "no expired records found in change events");
        } else {
            info!(
                received = report.received,
                archived = report.archived,
                rejected = report.rejected,
                skipped = report.skipped,
                "archived expired records"
            );
        }

        Ok(report)
    }

    fn payload(&self, event: StreamEvent) -> Option<ArchivePayload> {
        let Some(table) = event
            .event_source_arn
            .as_deref()
            .and_then(table_name_from_arn)
            .map(str::to_owned)
        else {
            warn!(
                arn = event.event_source_arn.as_deref().unwrap_or_default(),
                "could not parse table name from event source arn, skipping record"
            );
            return None;
        };

        let Some(image) = event.dynamodb.and_then(|images| images.old_image) else {
            warn!(table, "change event has no old image, skipping record");
            return None;
        };

        let record = match image_to_record(image) {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    table,
                    kind = ?err.kind(),
                    detail = err.detail().unwrap_or_default(),
                    "skipping record with an unreadable image"
                );
                return None;
            }
        };

        let data = match normalize_record(&record) {
            Ok(data) => data,
            Err(err) => {
                warn!(table, %err, "skipping record that cannot be normalized");
                return None;
            }
        };

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let timestamp = self.mapper.timestamp_for(&table, &record, now);

        Some(ArchivePayload {
            table,
            data,
            timestamp,
        })
    }

    async fn ship(&self, batch: Batch<Bytes>, report: &mut ArchiveReport) -> ArchiverResult<()> {
        let size = batch.len();
        let outcomes = self.writer.submit(batch.into_entries()).await?;
        ensure_aligned(size, outcomes.len())?;

        for (index, outcome) in outcomes.iter().enumerate() {
            match outcome {
                Outcome::Delivered => report.archived += 1,
                Outcome::Rejected(reason) => {
                    report.rejected += 1;
                    error!(index, %reason, "sink rejected archived record");
                }
            }
        }

        Ok(())
    }
}
