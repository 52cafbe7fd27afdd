use tracing::error;

use crate::bail;
use crate::error::{ArchiverResult, ErrorKind};
use crate::types::{Batch, BatchEntry, Outcome, PrimaryKey};

/// Keys confirmed for deletion and the number of rejected records of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub confirmed: Vec<PrimaryKey>,
    pub rejected_count: usize,
}

/// Fails with [`ErrorKind::InvalidState`] unless there is exactly one outcome per record.
pub fn ensure_aligned(records: usize, outcomes: usize) -> ArchiverResult<()> {
    if records != outcomes {
        bail!(
            ErrorKind::InvalidState,
            "Sink outcomes are not aligned with the submitted batch",
            format!("{records} records submitted, {outcomes} outcomes received")
        );
    }

    Ok(())
}

/// Matches outcomes to batch entries by position.
///
/// Keys of delivered entries are confirmed for deletion. Rejected entries are logged and
/// counted, their records stay in the source.
pub fn reconcile(batch: &Batch<BatchEntry>, outcomes: &[Outcome]) -> ArchiverResult<Reconciliation> {
    ensure_aligned(batch.len(), outcomes.len())?;

    let mut reconciliation = Reconciliation {
        confirmed: Vec::with_capacity(batch.len()),
        rejected_count: 0,
    };

    for (entry, outcome) in batch.iter().zip(outcomes) {
        match outcome {
            Outcome::Delivered => reconciliation.confirmed.push(entry.key.clone()),
            Outcome::Rejected(reason) => {
                reconciliation.rejected_count += 1;
                error!(key = %entry.key, %reason, "sink rejected record, it will not be purged");
            }
        }
    }

    Ok(reconciliation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProjectedPayload, Value};

    fn batch(size: i64) -> Batch<BatchEntry> {
        Batch::new(
            (0..size)
                .map(|id| BatchEntry {
                    payload: ProjectedPayload::new(Vec::new()),
                    key: PrimaryKey::new(vec![("id".to_string(), Value::from(id))]),
                })
                .collect(),
        )
    }

    #[test]
    fn confirms_delivered_positions_only() {
        let batch = batch(4);
        let outcomes = vec![
            Outcome::Delivered,
            Outcome::Rejected("throttled".to_string()),
            Outcome::Delivered,
            Outcome::Rejected("throttled".to_string()),
        ];

        let reconciliation = reconcile(&batch, &outcomes).unwrap();

        assert_eq!(reconciliation.rejected_count, 2);
        assert_eq!(
            reconciliation.confirmed,
            vec![batch.entries()[0].key.clone(), batch.entries()[2].key.clone()]
        );
    }

    #[test]
    fn length_mismatch_is_fatal() {
        let err = reconcile(&batch(3), &[Outcome::Delivered, Outcome::Delivered]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(err.halts_run());
    }
}
