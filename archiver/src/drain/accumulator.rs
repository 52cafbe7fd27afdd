use std::mem;

use crate::bail;
use crate::error::{ArchiverResult, ErrorKind};
use crate::types::Batch;

/// Groups items into batches of at most `limit` entries, in arrival order.
///
/// Never yields an empty batch.
#[derive(Debug)]
pub struct BatchAccumulator<T> {
    limit: usize,
    buffer: Vec<T>,
}

impl<T> BatchAccumulator<T> {
    pub fn new(limit: usize) -> ArchiverResult<Self> {
        if limit == 0 {
            bail!(ErrorKind::ConfigError, "Batch limit must be at least 1");
        }

        Ok(Self {
            limit,
            buffer: Vec::with_capacity(limit),
        })
    }

    /// Buffers `item`, returning a full batch once the limit is reached.
    pub fn push(&mut self, item: T) -> Option<Batch<T>> {
        self.buffer.push(item);
        if self.buffer.len() < self.limit {
            return None;
        }

        Some(Batch::new(mem::replace(
            &mut self.buffer,
            Vec::with_capacity(self.limit),
        )))
    }

    /// Returns the remaining items as a final partial batch, if any.
    pub fn finish(&mut self) -> Option<Batch<T>> {
        if self.buffer.is_empty() {
            return None;
        }

        Some(Batch::new(mem::take(&mut self.buffer)))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_full_batches_then_remainder() {
        let mut accumulator = BatchAccumulator::new(3).unwrap();
        let batches: Vec<_> = (0..7).filter_map(|item| accumulator.push(item)).collect();

        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|batch| batch.len() == 3));
        assert_eq!(accumulator.finish().unwrap().into_entries(), vec![6]);
        assert!(accumulator.finish().is_none());
    }

    #[test]
    fn exact_multiple_leaves_nothing_behind() {
        let mut accumulator = BatchAccumulator::new(2).unwrap();
        assert!(accumulator.push(1).is_none());
        assert!(accumulator.push(2).is_some());
        assert!(accumulator.is_empty());
        assert!(accumulator.finish().is_none());
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = BatchAccumulator::<u8>::new(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }
}
