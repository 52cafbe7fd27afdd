//! Telemetry setup shared by the archiver binaries and tests.

pub mod tracing;
