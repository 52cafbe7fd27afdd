//! Configuration types and loading for the archiver workspace.
//!
//! Shared configuration lives in [`shared`], while [`load_config`] assembles a configuration
//! from files on disk and `APP_`-prefixed environment variables.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config};
