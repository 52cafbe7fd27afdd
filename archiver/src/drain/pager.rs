use tracing::debug;

use crate::error::ArchiverResult;
use crate::source::SourceStore;
use crate::types::SourceRecord;

/// Lazily enumerates a source store one page at a time.
///
/// The pager owns the continuation cursor of the scan. A failed scan leaves the cursor in
/// place, so the same page is requested again on the next call.
pub struct Pager<'a, S: SourceStore> {
    source: &'a S,
    cursor: Option<S::Cursor>,
    exhausted: bool,
    pages: u64,
}

impl<'a, S> Pager<'a, S>
where
    S: SourceStore,
{
    /// Creates a pager positioned at the start of the scan.
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            cursor: None,
            exhausted: false,
            pages: 0,
        }
    }

    /// Returns the records of the next page, or `None` once the scan is complete.
    pub async fn next_page(&mut self) -> ArchiverResult<Option<Vec<SourceRecord>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self.source.scan_page(self.cursor.clone()).await?;
        self.pages += 1;
        self.exhausted = page.next_cursor.is_none();
        self.cursor = page.next_cursor;

        debug!(
            source = S::name(),
            page = self.pages,
            records = page.records.len(),
            exhausted = self.exhausted,
            "read source page"
        );

        Ok(Some(page.records))
    }

    /// Returns `true` once the store reported the last page.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of pages read so far.
    pub fn pages(&self) -> u64 {
        self.pages
    }
}
