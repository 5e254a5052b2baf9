//! Dispatch results.

use crate::publish::{PublishError, PublishReceipt};
use std::fmt;
use std::time::Duration;

/// Terminal state of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Succeeded {
        receipt: PublishReceipt,
        attempts: u32,
    },
    Failed {
        error: PublishError,
        attempts: u32,
        /// Record ids of this batch the service accepted before giving up.
        delivered: Vec<String>,
        /// Message ids assigned to `delivered`.
        receipt: PublishReceipt,
    },
    /// Never sent: cancellation was observed before the batch started.
    Cancelled,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Succeeded { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, BatchOutcome::Failed { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BatchOutcome::Cancelled)
    }

    /// Records of a batch of `size` that reached the service.
    pub fn delivered_count(&self, size: usize) -> usize {
        match self {
            BatchOutcome::Succeeded { .. } => size,
            BatchOutcome::Failed { delivered, .. } => delivered.len(),
            BatchOutcome::Cancelled => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub index: usize,
    pub size: usize,
    pub outcome: BatchOutcome,
}

/// Aggregate result of a dispatch run, ordered by batch index.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub batches: Vec<BatchReport>,
    /// Tasks whose result was lost because the task itself panicked or was aborted.
    pub lost: usize,
    pub elapsed: Duration,
}

impl DispatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, report: BatchReport) {
        self.batches.push(report);
    }

    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.batches.sort_by_key(|b| b.index);
        self.elapsed = elapsed;
    }

    pub fn total(&self) -> usize {
        self.batches.len() + self.lost
    }

    pub fn success_count(&self) -> usize {
        self.batches.iter().filter(|b| b.outcome.is_success()).count()
    }

    /// Failed batches, including lost tasks.
    pub fn failure_count(&self) -> usize {
        self.batches.iter().filter(|b| b.outcome.is_failure()).count() + self.lost
    }

    pub fn cancelled_count(&self) -> usize {
        self.batches.iter().filter(|b| b.outcome.is_cancelled()).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.success_count() == self.total()
    }

    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.success_count() as f64 / self.total() as f64
        }
    }

    /// Records accepted by the service, including those from partially failed batches.
    pub fn records_published(&self) -> usize {
        self.batches
            .iter()
            .map(|b| b.outcome.delivered_count(b.size))
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &PublishError)> {
        self.batches.iter().filter_map(|b| match &b.outcome {
            BatchOutcome::Failed { error, .. } => Some((b.index, error)),
            _ => None,
        })
    }
}

impl fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} batches: {} succeeded, {} failed, {} cancelled ({} records published)",
            self.total(),
            self.success_count(),
            self.failure_count(),
            self.cancelled_count(),
            self.records_published()
        )
    }
}
