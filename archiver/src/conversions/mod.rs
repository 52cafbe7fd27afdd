//! Conversions from source values to sink JSON.

pub mod json;
pub mod numeric;
