//! Data model shared by the drain pipeline and the archive variant.

mod batch;
mod payload;
mod record;
mod value;

pub use batch::*;
pub use payload::*;
pub use record::*;
pub use value::*;
