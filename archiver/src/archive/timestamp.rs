use std::collections::HashMap;

use tracing::error;

use crate::types::SourceRecord;

/// Table whose archive timestamp is the creation time embedded in `createdAt#status`.
pub const ROOM_REQUESTS_STATUS_TABLE: &str = "infra-core-api-room-requests-status";

/// Extracts the archive timestamp of a record, `None` when the record does not carry one.
pub type TimestampExtractor = fn(&SourceRecord) -> Option<String>;

/// Per-table timestamp extraction, resolved once at startup.
#[derive(Debug, Clone, Default)]
pub struct TimestampMapper {
    extractors: HashMap<String, TimestampExtractor>,
}

impl TimestampMapper {
    /// Creates a mapper without any extractor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mapper with the built-in extractors.
    pub fn with_defaults() -> Self {
        Self::new().register(ROOM_REQUESTS_STATUS_TABLE, room_request_created_at)
    }

    pub fn register(mut self, table: impl Into<String>, extractor: TimestampExtractor) -> Self {
        self.extractors.insert(table.into(), extractor);
        self
    }

    pub fn get(&self, table: &str) -> Option<TimestampExtractor> {
        self.extractors.get(table).copied()
    }

    /// Returns the archive timestamp of `record`, falling back to `now`.
    pub fn timestamp_for(&self, table: &str, record: &SourceRecord, now: String) -> String {
        let Some(extractor) = self.get(table) else {
            return now;
        };

        match extractor(record) {
            Some(timestamp) => timestamp,
            None => {
                error!(table, "failed to extract archive timestamp, using the current time");
                now
            }
        }
    }
}

fn room_request_created_at(record: &SourceRecord) -> Option<String> {
    let created_at_status = record.get("createdAt#status")?.as_str()?;
    created_at_status.split('#').next().map(str::to_owned)
}
