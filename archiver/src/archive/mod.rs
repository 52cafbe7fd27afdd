//! Archiving of records removed upstream, driven by change events.
//!
//! Time-to-live removals arrive as a change-event document. Their old images are normalized,
//! wrapped with the table name and a timestamp, and shipped through the same batching and sink
//! path as a drain run. Nothing is purged: the store already removed the records.

mod archiver;
mod event;
mod timestamp;

pub use archiver::{ArchivePayload, ArchiveReport, Archiver};
pub use event::{
    REMOVE_EVENT_NAME, STORE_SERVICE_PRINCIPAL, StreamAttribute, StreamEvent, StreamEventBatch,
    StreamImages, UserIdentity, image_to_record, table_name_from_arn,
};
pub use timestamp::{ROOM_REQUESTS_STATUS_TABLE, TimestampExtractor, TimestampMapper};
