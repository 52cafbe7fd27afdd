use tracing::{error, info, warn};

use crate::source::SourceStore;
use crate::types::PrimaryKey;

/// Tally of one purge call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeOutcome {
    pub deleted: u64,
    pub failed: u64,
}

/// Deletes confirmed keys from the source store.
///
/// Deletion failures are logged and skipped. They never end the run, the records simply stay
/// in the source for a later run.
pub struct PurgeWriter<'a, S> {
    source: &'a S,
}

impl<'a, S> PurgeWriter<'a, S>
where
    S: SourceStore,
{
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    pub async fn purge(&self, keys: Vec<PrimaryKey>) -> PurgeOutcome {
        let requested = keys.len() as u64;
        if requested == 0 {
            return PurgeOutcome::default();
        }

        let failed = match self.source.delete_keys(keys).await {
            Ok(outcome) => {
                for failure in &outcome.failures {
                    warn!(
                        source = S::name(),
                        key = %failure.key,
                        reason = %failure.reason,
                        "failed to delete record, it will be retried on the next run"
                    );
                }
                outcome.failures.len() as u64
            }
            Err(err) => {
                error!(
                    source = S::name(),
                    keys = requested,
                    kind = ?err.kind(),
                    detail = err.detail().unwrap_or_default(),
                    "bulk deletion failed, no key of this batch was purged"
                );
                requested
            }
        };

        let outcome = PurgeOutcome {
            deleted: requested.saturating_sub(failed),
            failed: failed.min(requested),
        };
        info!(
            source = S::name(),
            deleted = outcome.deleted,
            failed = outcome.failed,
            "purged confirmed records"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::MemorySource;
    use crate::types::{SourceRecord, Value};

    fn key(id: i64) -> PrimaryKey {
        PrimaryKey::new(vec![("id".to_string(), Value::from(id))])
    }

    #[tokio::test]
    async fn one_failing_key_does_not_block_the_others() {
        let source = MemorySource::new();
        source
            .insert_records((0..3).map(|id| SourceRecord::from_iter([("id", Value::from(id))])))
            .await;
        source.fail_delete(key(1)).await;

        let outcome = PurgeWriter::new(&source)
            .purge(vec![key(0), key(1), key(2)])
            .await;

        assert_eq!(outcome, PurgeOutcome { deleted: 2, failed: 1 });
        assert_eq!(source.len().await, 1);
    }
}
