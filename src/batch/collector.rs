//! Batch collector.

use super::{Batch, BatchConfig, RemainderPolicy};
use crate::message::Record;

/// Accumulates records until a full batch is available.
///
/// The collector is owned by the generating side; batches handed out by
/// [`take`](BatchCollector::take) are independent of it.
#[derive(Debug)]
pub struct BatchCollector {
    config: BatchConfig,
    items: Vec<Record>,
    next_index: usize,
}

impl BatchCollector {
    pub fn new(config: BatchConfig) -> Self {
        let cap = config.max_batch_size.max(1);
        Self {
            config,
            items: Vec::with_capacity(cap),
            next_index: 0,
        }
    }

    pub fn push(&mut self, record: Record) -> BatchAddResult {
        self.items.push(record);
        let count = self.items.len();
        if count >= self.config.max_batch_size.max(1) {
            BatchAddResult::Full { count }
        } else {
            BatchAddResult::Added { count }
        }
    }

    /// Hand out the buffered records as the next batch and reset the buffer.
    pub fn take(&mut self) -> Option<Batch> {
        if self.items.is_empty() {
            return None;
        }
        let cap = self.config.max_batch_size.max(1);
        let records = std::mem::replace(&mut self.items, Vec::with_capacity(cap));
        let batch = Batch::new(self.next_index, records);
        self.next_index += 1;
        Some(batch)
    }

    /// Close the collector, applying the remainder policy to whatever is buffered.
    ///
    /// Returns the trailing batch (under `Flush`) and the number of records dropped
    /// (under `Drop`).
    pub fn finish(mut self) -> (Option<Batch>, usize) {
        match self.config.remainder {
            RemainderPolicy::Flush => (self.take(), 0),
            RemainderPolicy::Drop => (None, self.items.len()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of batches handed out so far.
    pub fn batches_taken(&self) -> usize {
        self.next_index
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchAddResult {
    Added { count: usize },
    Full { count: usize },
}

impl BatchAddResult {
    pub fn is_full(&self) -> bool {
        matches!(self, BatchAddResult::Full { .. })
    }

    pub fn count(&self) -> usize {
        match self {
            BatchAddResult::Added { count } | BatchAddResult::Full { count } => *count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(i: usize) -> Record {
        Record::new(format!("id-{}", i), "payload")
    }

    #[test]
    fn test_collector_empty() {
        let mut collector = BatchCollector::new(BatchConfig::new().with_max_batch_size(5));
        assert!(collector.is_empty());
        assert_eq!(collector.len(), 0);
        assert!(collector.take().is_none());
    }

    #[test]
    fn test_collector_reports_full() {
        let mut collector = BatchCollector::new(BatchConfig::new().with_max_batch_size(3));

        assert_eq!(collector.push(rec(1)), BatchAddResult::Added { count: 1 });
        assert!(!collector.push(rec(2)).is_full());

        let result = collector.push(rec(3));
        assert!(result.is_full());
        assert_eq!(result.count(), 3);
    }

    #[test]
    fn test_take_resets_and_numbers_batches() {
        let mut collector = BatchCollector::new(BatchConfig::new().with_max_batch_size(2));
        collector.push(rec(1));
        collector.push(rec(2));
        let first = collector.take().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.ids().collect::<Vec<_>>(), vec!["id-1", "id-2"]);
        assert!(collector.is_empty());

        collector.push(rec(3));
        collector.push(rec(4));
        let second = collector.take().unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(collector.batches_taken(), 2);
    }

    #[test]
    fn test_finish_flush_returns_remainder() {
        let config = BatchConfig::new()
            .with_max_batch_size(10)
            .with_remainder(RemainderPolicy::Flush);
        let mut collector = BatchCollector::new(config);
        for i in 0..4 {
            collector.push(rec(i));
        }
        let (batch, dropped) = collector.finish();
        assert_eq!(batch.map(|b| b.len()), Some(4));
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_finish_drop_counts_remainder() {
        let config = BatchConfig::new()
            .with_max_batch_size(10)
            .with_remainder(RemainderPolicy::Drop);
        let mut collector = BatchCollector::new(config);
        for i in 0..4 {
            collector.push(rec(i));
        }
        let (batch, dropped) = collector.finish();
        assert!(batch.is_none());
        assert_eq!(dropped, 4);
    }

    #[test]
    fn test_finish_on_empty_collector() {
        let collector = BatchCollector::new(BatchConfig::default());
        assert_eq!(collector.finish(), (None, 0));
    }
}
