use crate::drain::Projector;
use crate::source::memory::MemorySource;
use crate::types::{PrimaryKey, SourceRecord, Value};

/// Attributes shipped for every audit log entry, in payload order.
pub const AUDIT_LOG_OUTPUT_ATTRIBUTES: [&str; 6] =
    ["module", "createdAt", "actor", "message", "requestId", "target"];

/// Partition and sort key of the audit log table.
pub const AUDIT_LOG_KEY_ATTRIBUTES: [&str; 2] = ["module", "createdAt"];

pub fn audit_log_projector() -> Projector {
    Projector::new(
        AUDIT_LOG_OUTPUT_ATTRIBUTES.map(str::to_owned).to_vec(),
        AUDIT_LOG_KEY_ATTRIBUTES.map(str::to_owned).to_vec(),
    )
}

/// Builds the `index`-th audit log entry. Every entry has a distinct key.
pub fn audit_log_record(index: i64) -> SourceRecord {
    SourceRecord::from_iter([
        ("module", Value::from(format!("module-{}", index % 3))),
        ("createdAt", Value::from(1_700_000_000 + index)),
        ("actor", Value::from("admin@example.com")),
        ("message", Value::from(format!("updated entry {index}"))),
        ("requestId", Value::from(format!("req-{index}"))),
        ("target", Value::from("acm")),
        ("expiresAt", Value::from(1_800_000_000_i64)),
    ])
}

/// Builds the first `count` audit log entries.
pub fn audit_log_records(count: i64) -> Vec<SourceRecord> {
    (0..count).map(audit_log_record).collect()
}

/// Builds the `index`-th audit log entry without `attribute`.
pub fn audit_log_record_without(index: i64, attribute: &str) -> SourceRecord {
    audit_log_record(index)
        .into_attributes()
        .into_iter()
        .filter(|(name, _)| name != attribute)
        .collect()
}

/// Returns the key of the `index`-th audit log entry.
pub fn audit_log_key(index: i64) -> PrimaryKey {
    let record = audit_log_record(index);
    PrimaryKey::new(
        AUDIT_LOG_KEY_ATTRIBUTES
            .iter()
            .filter_map(|name| Some((name.to_string(), record.get(name)?.clone())))
            .collect(),
    )
}

/// Creates a memory source holding the first `count` audit log entries.
pub async fn seeded_source(count: i64, page_size: usize) -> MemorySource {
    let source = MemorySource::with_page_size(page_size);
    source.insert_records(audit_log_records(count)).await;
    source
}
