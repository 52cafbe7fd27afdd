use std::future::Future;

use crate::error::ArchiverResult;
use crate::types::{PrimaryKey, SourceRecord};

/// One page of a source scan.
#[derive(Debug, Clone)]
pub struct Page<C> {
    pub records: Vec<SourceRecord>,
    /// Continuation for the next page, absent once the scan is complete.
    pub next_cursor: Option<C>,
}

/// A key whose deletion failed, with the reason reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub key: PrimaryKey,
    pub reason: String,
}

/// Result of a bulk deletion. Keys not listed in `failures` were deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub failures: Vec<DeleteFailure>,
}

/// Trait for stores that can be drained page by page and purged by primary key.
///
/// Implementations classify their errors so the driver can tell apart configuration problems
/// ([`crate::error::ErrorKind::SourceNotFound`], [`crate::error::ErrorKind::ConfigError`]) from
/// an unreachable store ([`crate::error::ErrorKind::SourceUnavailable`]). Both end a run.
pub trait SourceStore {
    /// Opaque continuation token returned by [`SourceStore::scan_page`].
    type Cursor: Clone + Send + Sync;

    /// Returns the name of the source store.
    fn name() -> &'static str;

    /// Checks that the store exists and is reachable before a run starts.
    ///
    /// The default implementation accepts every store.
    fn validate(&self) -> impl Future<Output = ArchiverResult<()>> + Send {
        async { Ok(()) }
    }

    /// Reads the page that follows `cursor`, or the first page when `cursor` is `None`.
    ///
    /// Every record in the store must be returned exactly once across a full scan. Records
    /// inserted or deleted while a scan is in progress may or may not be observed.
    fn scan_page(
        &self,
        cursor: Option<Self::Cursor>,
    ) -> impl Future<Output = ArchiverResult<Page<Self::Cursor>>> + Send;

    /// Deletes every key, reporting the keys that could not be deleted.
    ///
    /// Deleting an absent key is not a failure. A failed key must not prevent the deletion of
    /// the others.
    fn delete_keys(
        &self,
        keys: Vec<PrimaryKey>,
    ) -> impl Future<Output = ArchiverResult<DeleteOutcome>> + Send;
}
