use std::fmt;
use std::slice;

use crate::types::{PrimaryKey, ProjectedPayload};

/// A projected record waiting to be shipped, paired with the key used to purge it.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub payload: ProjectedPayload,
    pub key: PrimaryKey,
}

/// An ordered, non-empty group of entries submitted to the sink in one call.
///
/// Position `i` of the batch corresponds to position `i` of the sink outcomes for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    entries: Vec<T>,
}

impl<T> Batch<T> {
    pub(crate) fn new(entries: Vec<T>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<T> {
        self.entries
    }
}

impl<'a, T> IntoIterator for &'a Batch<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Delivery outcome of a single batch entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Delivered,
    Rejected(String),
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Delivered => f.write_str("delivered"),
            Outcome::Rejected(reason) => write!(f, "rejected: {reason}"),
        }
    }
}

/// Outcomes of a batch, positionally aligned with its entries.
pub type OutcomeList = Vec<Outcome>;
