//! Shared configuration types for archiver runs.

mod archiver;
mod base;
mod batch;
mod projection;
mod sink;
mod source;

pub use archiver::ArchiverConfig;
pub use base::ValidationError;
pub use batch::BatchConfig;
pub use projection::ProjectionConfig;
pub use sink::SinkConfig;
pub use source::SourceConfig;
