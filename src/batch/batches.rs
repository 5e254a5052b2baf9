//! Iterator adapter that partitions records into batches.

use super::{Batch, BatchCollector, BatchConfig};
use crate::message::Record;

/// Lazily groups an upstream record iterator into [`Batch`]es.
///
/// Records are pulled from upstream only as fast as batches are consumed.
#[derive(Debug)]
pub struct Batches<I> {
    inner: I,
    collector: Option<BatchCollector>,
    dropped: usize,
}

impl<I> Batches<I>
where
    I: Iterator<Item = Record>,
{
    pub fn new(inner: I, config: BatchConfig) -> Self {
        Self {
            inner,
            collector: Some(BatchCollector::new(config)),
            dropped: 0,
        }
    }

    /// Records discarded by `RemainderPolicy::Drop`. Only final once the
    /// iterator has returned `None`.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl<I> Iterator for Batches<I>
where
    I: Iterator<Item = Record>,
{
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let collector = self.collector.as_mut()?;
        for record in self.inner.by_ref() {
            if collector.push(record).is_full() {
                return collector.take();
            }
        }
        let collector = self.collector.take()?;
        let (tail, dropped) = collector.finish();
        self.dropped = dropped;
        tail
    }
}

pub trait IntoBatches: Iterator<Item = Record> + Sized {
    fn batches(self, config: &BatchConfig) -> Batches<Self> {
        Batches::new(self, config.clone())
    }
}

impl<I> IntoBatches for I where I: Iterator<Item = Record> {}
