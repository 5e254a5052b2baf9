use super::{PublishError, PublishReceipt, Publisher};
use crate::batch::Batch;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::trace;

/// Accepts every batch without any network I/O.
///
/// Optionally sleeps per call to simulate remote latency.
#[derive(Debug, Default)]
pub struct DryRunPublisher {
    latency: Option<Duration>,
    batches: AtomicUsize,
    records: AtomicUsize,
}

impl DryRunPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency).filter(|d| !d.is_zero());
        self
    }

    pub fn batches_published(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }

    pub fn records_published(&self) -> usize {
        self.records.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn publish_batch(&self, batch: &Batch) -> Result<PublishReceipt, PublishError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.records.fetch_add(batch.len(), Ordering::Relaxed);
        trace!(batch = batch.index, entries = batch.len(), "dry-run publish");
        Ok(PublishReceipt {
            message_ids: batch.ids().map(|id| format!("dry-run-{}", id)).collect(),
        })
    }
}
