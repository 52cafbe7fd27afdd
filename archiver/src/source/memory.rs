use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::bail;
use crate::error::{ArchiverResult, ErrorKind};
use crate::source::{DeleteFailure, DeleteOutcome, Page, SourceStore};
use crate::types::{PrimaryKey, SourceRecord};

/// Number of records returned per page when none is configured.
const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug)]
struct Inner {
    records: BTreeMap<u64, SourceRecord>,
    next_sequence: u64,
    page_size: usize,
    scans: usize,
    failing_scans: HashSet<usize>,
    failing_keys: Vec<PrimaryKey>,
    missing: bool,
}

/// In-memory source store for tests and local experiments.
///
/// Records are returned in insertion order and the cursor is the sequence number of the last
/// record of a page, so deletions during a scan never shift later pages. Failures can be
/// injected per scan call and per key.
#[derive(Debug, Clone)]
pub struct MemorySource {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        let inner = Inner {
            records: BTreeMap::new(),
            next_sequence: 0,
            page_size: page_size.max(1),
            scans: 0,
            failing_scans: HashSet::new(),
            failing_keys: Vec::new(),
            missing: false,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Appends records to the store.
    pub async fn insert_records(&self, records: impl IntoIterator<Item = SourceRecord>) {
        let mut inner = self.inner.lock().await;
        for record in records {
            let sequence = inner.next_sequence;
            inner.next_sequence += 1;
            inner.records.insert(sequence, record);
        }
    }

    /// Returns a copy of the records currently stored, in insertion order.
    pub async fn records(&self) -> Vec<SourceRecord> {
        let inner = self.inner.lock().await;
        inner.records.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.records.is_empty()
    }

    /// Makes the `call`-th scan (1-based, counted over the lifetime of the store) fail as
    /// unavailable.
    pub async fn fail_scan(&self, call: usize) {
        self.inner.lock().await.failing_scans.insert(call);
    }

    /// Makes every deletion of `key` fail.
    pub async fn fail_delete(&self, key: PrimaryKey) {
        self.inner.lock().await.failing_keys.push(key);
    }

    /// Makes the store behave as if it did not exist.
    pub async fn set_missing(&self, missing: bool) {
        self.inner.lock().await.missing = missing;
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceStore for MemorySource {
    type Cursor = u64;

    fn name() -> &'static str {
        "memory"
    }

    async fn validate(&self) -> ArchiverResult<()> {
        if self.inner.lock().await.missing {
            bail!(ErrorKind::SourceNotFound, "Memory source does not exist");
        }

        Ok(())
    }

    async fn scan_page(&self, cursor: Option<u64>) -> ArchiverResult<Page<u64>> {
        let mut inner = self.inner.lock().await;
        if inner.missing {
            bail!(ErrorKind::SourceNotFound, "Memory source does not exist");
        }

        inner.scans += 1;
        let call = inner.scans;
        if inner.failing_scans.contains(&call) {
            bail!(
                ErrorKind::SourceUnavailable,
                "Memory source scan failed",
                format!("injected failure on scan {call}")
            );
        }

        let start = cursor.map_or(0, |last| last + 1);
        let mut records = Vec::with_capacity(inner.page_size);
        let mut last_sequence = None;
        for (sequence, record) in inner.records.range(start..).take(inner.page_size) {
            records.push(record.clone());
            last_sequence = Some(*sequence);
        }

        let next_cursor =
            last_sequence.filter(|last| inner.records.range(last + 1..).next().is_some());

        info!(records = records.len(), "scanned memory source page");

        Ok(Page {
            records,
            next_cursor,
        })
    }

    async fn delete_keys(&self, keys: Vec<PrimaryKey>) -> ArchiverResult<DeleteOutcome> {
        let mut inner = self.inner.lock().await;
        let mut outcome = DeleteOutcome::default();

        for key in keys {
            if inner.failing_keys.contains(&key) {
                outcome.failures.push(DeleteFailure {
                    key,
                    reason: "injected deletion failure".to_string(),
                });
                continue;
            }

            inner.records.retain(|_, record| !record.matches_key(&key));
        }

        info!(failures = outcome.failures.len(), "deleted keys from memory source");

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn record(id: i64) -> SourceRecord {
        SourceRecord::from_iter([("id", Value::from(id))])
    }

    fn key(id: i64) -> PrimaryKey {
        PrimaryKey::new(vec![("id".to_string(), Value::from(id))])
    }

    #[tokio::test]
    async fn scans_every_record_once_across_pages() {
        let source = MemorySource::with_page_size(2);
        source.insert_records((0..5).map(record)).await;

        let mut cursor = None;
        let mut seen = Vec::new();
        loop {
            let page = source.scan_page(cursor).await.unwrap();
            seen.extend(page.records);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(seen, (0..5).map(record).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn deleting_absent_or_failing_keys() {
        let source = MemorySource::new();
        source.insert_records((0..3).map(record)).await;
        source.fail_delete(key(1)).await;

        let outcome = source
            .delete_keys(vec![key(0), key(1), key(42)])
            .await
            .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].key, key(1));
        assert_eq!(source.records().await, vec![record(1), record(2)]);
    }

    #[tokio::test]
    async fn injected_scan_failure_is_unavailable() {
        let source = MemorySource::new();
        source.fail_scan(1).await;

        let err = source.scan_page(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }
}
