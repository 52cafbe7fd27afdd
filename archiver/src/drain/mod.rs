//! The batched transfer-and-purge pipeline.
//!
//! Records flow strictly left to right, one batch at a time:
//! [`Pager`] → [`Projector`] → [`BatchAccumulator`] → [`SinkWriter`] → [`reconcile`] →
//! [`PurgeWriter`]. The [`Driver`] runs the loop and keeps the run tallies.

mod accumulator;
mod driver;
mod pager;
mod projector;
mod purge;
mod reconciler;
mod writer;

pub use accumulator::BatchAccumulator;
pub use driver::{DrainReport, Driver, DriverState, Termination};
pub use pager::Pager;
pub use projector::{ProjectionError, Projector, normalize_record};
pub use purge::{PurgeOutcome, PurgeWriter};
pub use reconciler::{Reconciliation, ensure_aligned, reconcile};
pub use writer::{SinkWriter, encode_record};
