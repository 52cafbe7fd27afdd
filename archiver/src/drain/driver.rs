use std::collections::VecDeque;
use std::fmt;

use archiver_config::shared::ArchiverConfig;
use tracing::{error, info, warn};

use crate::{archiver_error, bail};
use crate::drain::accumulator::BatchAccumulator;
use crate::drain::pager::Pager;
use crate::drain::projector::Projector;
use crate::drain::purge::PurgeWriter;
use crate::drain::reconciler::reconcile;
use crate::drain::writer::{SinkWriter, encode_record};
use crate::error::{ArchiverError, ArchiverResult, ErrorKind};
use crate::sink::Sink;
use crate::source::SourceStore;
use crate::types::{Batch, BatchEntry, Outcome, OutcomeList, PrimaryKey};

/// How a drain run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    /// The whole source was scanned.
    Completed,
    /// The run stopped early on a configuration error, an unreachable source or a broken
    /// batch alignment.
    Halted(ArchiverError),
}

/// Tallies of a drain run.
///
/// `deleted <= sent <= scanned` always holds. A halted run reports what it achieved before
/// stopping.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainReport {
    /// Records read from the source.
    pub scanned: u64,
    /// Records skipped because they could not be projected.
    pub skipped: u64,
    /// Records the sink confirmed.
    pub sent: u64,
    /// Records rejected by the sink, including whole failed batches.
    pub rejected: u64,
    /// Records deleted from the source.
    pub deleted: u64,
    /// Confirmed records whose deletion failed.
    pub delete_failures: u64,
    /// Batches submitted to the sink.
    pub batches: u64,
    /// Source pages read.
    pub pages: u64,
    pub termination: Termination,
}

impl DrainReport {
    fn new() -> Self {
        Self {
            scanned: 0,
            skipped: 0,
            sent: 0,
            rejected: 0,
            deleted: 0,
            delete_failures: 0,
            batches: 0,
            pages: 0,
            termination: Termination::Completed,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.termination, Termination::Completed)
    }

    /// Returns the error that halted the run, if any.
    pub fn error(&self) -> Option<&ArchiverError> {
        match &self.termination {
            Termination::Completed => None,
            Termination::Halted(err) => Some(err),
        }
    }
}

impl fmt::Display for DrainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned={} sent={} deleted={}",
            self.scanned, self.sent, self.deleted
        )
    }
}

/// States of the drain loop.
///
/// Each batch goes through sending, reconciling and purging before scanning resumes, so a
/// batch's deletions never race its own delivery.
#[derive(Debug)]
pub enum DriverState {
    Scanning,
    Sending(Batch<BatchEntry>),
    Reconciling(Batch<BatchEntry>, OutcomeList),
    Purging(Vec<PrimaryKey>),
    Done,
}

impl DriverState {
    fn name(&self) -> &'static str {
        match self {
            DriverState::Scanning => "scanning",
            DriverState::Sending(_) => "sending",
            DriverState::Reconciling(..) => "reconciling",
            DriverState::Purging(_) => "purging",
            DriverState::Done => "done",
        }
    }
}

/// Drains a source store into a sink, purging what the sink confirmed.
///
/// Runs are single-threaded: one batch is fully sent, reconciled and purged before the next
/// one starts. Two runs against the same source and sink must not execute concurrently.
#[derive(Debug)]
pub struct Driver<S, K> {
    source: S,
    writer: SinkWriter<K>,
    projector: Projector,
    batch_size: usize,
}

impl<S, K> Driver<S, K>
where
    S: SourceStore,
    K: Sink,
{
    pub fn new(source: S, sink: K, projector: Projector, batch_size: usize) -> Self {
        Self {
            source,
            writer: SinkWriter::new(sink),
            projector,
            batch_size,
        }
    }

    /// Builds a driver from the projection and batch settings of `config`.
    pub fn from_config(source: S, sink: K, config: &ArchiverConfig) -> Self {
        Self::new(
            source,
            sink,
            Projector::from_config(&config.projection),
            config.batch.max_size,
        )
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        self.writer.sink()
    }

    /// Runs the drain to completion and returns its tallies.
    ///
    /// Never fails: an error that ends the run is carried by [`DrainReport::termination`]
    /// next to the tallies accumulated until then.
    pub async fn run(&self) -> DrainReport {
        let mut report = DrainReport::new();

        info!(
            source = S::name(),
            sink = K::name(),
            batch_size = self.batch_size,
            "starting drain run"
        );

        if let Err(err) = self.drain(&mut report).await {
            error!(
                kind = ?err.kind(),
                scanned = report.scanned,
                sent = report.sent,
                deleted = report.deleted,
                "drain run halted: {err}"
            );
            report.termination = Termination::Halted(err);
        }

        info!(
            scanned = report.scanned,
            skipped = report.skipped,
            sent = report.sent,
            rejected = report.rejected,
            deleted = report.deleted,
            delete_failures = report.delete_failures,
            batches = report.batches,
            pages = report.pages,
            completed = report.is_completed(),
            "drain run finished"
        );

        report
    }

    async fn preflight(&self) -> ArchiverResult<()> {
        let limit = self.writer.sink().max_batch_records();
        if self.batch_size == 0 || self.batch_size > limit {
            bail!(
                ErrorKind::ConfigError,
                "Batch size must be between 1 and the sink record limit",
                format!("batch size {}, sink limit {limit}", self.batch_size)
            );
        }

        contain(self.source.validate().await, S::name(), "source validation failed")?;
        contain(self.writer.sink().validate().await, K::name(), "sink validation failed")
    }

    async fn drain(&self, report: &mut DrainReport) -> ArchiverResult<()> {
        self.preflight().await?;

        let mut pager = Pager::new(&self.source);
        let mut accumulator = BatchAccumulator::new(self.batch_size)?;
        let purge_writer = PurgeWriter::new(&self.source);
        let mut ready = VecDeque::new();

        let mut state = DriverState::Scanning;
        loop {
            state = match state {
                DriverState::Scanning => {
                    let page = pager.next_page().await;
                    report.pages = pager.pages();

                    if let Some(records) = page.map_err(unavailable)? {
                        for record in records {
                            report.scanned += 1;
                            match self.projector.project(&record) {
                                Ok((payload, key)) => {
                                    if let Some(batch) =
                                        accumulator.push(BatchEntry { payload, key })
                                    {
                                        ready.push_back(batch);
                                    }
                                }
                                Err(err) => {
                                    report.skipped += 1;
                                    warn!(%err, "skipping record, it is neither sent nor deleted");
                                }
                            }
                        }
                    }

                    if pager.is_exhausted()
                        && let Some(batch) = accumulator.finish()
                    {
                        ready.push_back(batch);
                    }

                    next_state(&mut ready, &pager, &accumulator)
                }
                DriverState::Sending(batch) => {
                    let encoded = batch
                        .iter()
                        .map(|entry| encode_record(&entry.payload))
                        .collect::<ArchiverResult<Vec<_>>>();

                    report.batches += 1;
                    let outcomes = match encoded {
                        Ok(records) => self.writer.send(records).await?,
                        Err(err) => {
                            warn!(
                                %err,
                                size = batch.len(),
                                "batch could not be encoded, no record of it will be purged"
                            );
                            vec![Outcome::Rejected(err.to_string()); batch.len()]
                        }
                    };

                    DriverState::Reconciling(batch, outcomes)
                }
                DriverState::Reconciling(batch, outcomes) => {
                    let reconciliation = reconcile(&batch, &outcomes)?;
                    report.sent += reconciliation.confirmed.len() as u64;
                    report.rejected += reconciliation.rejected_count as u64;

                    info!(
                        batch = report.batches,
                        size = batch.len(),
                        confirmed = reconciliation.confirmed.len(),
                        rejected = reconciliation.rejected_count,
                        "reconciled batch"
                    );

                    DriverState::Purging(reconciliation.confirmed)
                }
                DriverState::Purging(keys) => {
                    let outcome = purge_writer.purge(keys).await;
                    report.deleted += outcome.deleted;
                    report.delete_failures += outcome.failed;

                    next_state(&mut ready, &pager, &accumulator)
                }
                DriverState::Done => return Ok(()),
            };

            tracing::trace!(state = state.name(), "drain state transition");
        }
    }
}

/// Passes through errors that end a run and logs the others.
fn contain(result: ArchiverResult<()>, component: &str, message: &str) -> ArchiverResult<()> {
    match result {
        Err(err) if err.halts_run() => Err(err),
        Err(err) => {
            warn!(component, kind = ?err.kind(), %err, "{message}, continuing");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

/// A page that cannot be read leaves the rest of the scan unreachable.
fn unavailable(err: ArchiverError) -> ArchiverError {
    if err.halts_run() {
        return err;
    }

    archiver_error!(
        ErrorKind::SourceUnavailable,
        "Source page could not be read",
        err.to_string(),
        source: err
    )
}

fn next_state<S: SourceStore>(
    ready: &mut VecDeque<Batch<BatchEntry>>,
    pager: &Pager<'_, S>,
    accumulator: &BatchAccumulator<BatchEntry>,
) -> DriverState {
    if let Some(batch) = ready.pop_front() {
        return DriverState::Sending(batch);
    }

    if pager.is_exhausted() && accumulator.is_empty() {
        return DriverState::Done;
    }

    DriverState::Scanning
}
