//! Bounded concurrent batch dispatcher.

use super::policy::{Decision, RetryPolicy};
use super::report::{BatchOutcome, BatchReport, DispatchReport};
use super::signals::InflightSnapshot;
use crate::batch::Batch;
use crate::publish::{PublishReceipt, Publisher};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default size of the permit pool.
pub const DEFAULT_MAX_INFLIGHT: usize = 500;

/// How the dispatcher reacts to a batch that failed for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Keep dispatching; the failure shows up in the report.
    #[default]
    Continue,
    /// Stop starting new batches; in-flight ones still finish.
    #[serde(alias = "cancel", alias = "cancel_remaining")]
    CancelRemaining,
}

impl FromStr for FailureMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(FailureMode::Continue),
            "cancel" | "cancelremaining" | "cancel-remaining" | "cancel_remaining" => {
                Ok(FailureMode::CancelRemaining)
            }
            other => Err(Error::configuration_with_context(
                format!("unknown failure mode '{}'", other),
                ErrorContext::new()
                    .with_field_path("dispatch.failure_mode")
                    .with_details("expected 'continue' or 'cancel'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub max_inflight: usize,
    pub failure_mode: FailureMode,
    pub retry: RetryPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_inflight: DEFAULT_MAX_INFLIGHT,
            failure_mode: FailureMode::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_inflight(mut self, n: usize) -> Self {
        self.max_inflight = n;
        self
    }

    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_inflight == 0 {
            return Err(Error::validation_with_context(
                "max_inflight must be at least 1",
                ErrorContext::new()
                    .with_field_path("dispatch.max_inflight")
                    .with_source("dispatcher_config"),
            ));
        }
        Ok(())
    }
}

/// Publishes batches concurrently, at most `max_inflight` at a time.
///
/// A permit is acquired *before* a task is spawned and released when that task
/// finishes, so pulling from the batch iterator is paced by the permit pool.
pub struct BatchDispatcher<P> {
    publisher: Arc<P>,
    config: DispatcherConfig,
    permits: Arc<Semaphore>,
}

impl<P> BatchDispatcher<P>
where
    P: Publisher + 'static,
{
    pub fn new(publisher: Arc<P>, config: DispatcherConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_inflight.max(1)));
        Self {
            publisher,
            config,
            permits,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn inflight(&self) -> InflightSnapshot {
        let max = self.config.max_inflight.max(1);
        let available = self.permits.available_permits();
        InflightSnapshot {
            max,
            available,
            in_use: max.saturating_sub(available),
        }
    }

    pub async fn dispatch_all<I>(&self, batches: I) -> DispatchReport
    where
        I: IntoIterator<Item = Batch>,
    {
        self.dispatch_all_with_cancel(batches, CancellationToken::new())
            .await
    }

    /// Dispatch every batch and wait for all of them to reach a terminal state.
    ///
    /// Once `cancel` fires (externally, or internally under
    /// [`FailureMode::CancelRemaining`]) batches that have not started are
    /// recorded as cancelled.
    pub async fn dispatch_all_with_cancel<I>(
        &self,
        batches: I,
        cancel: CancellationToken,
    ) -> DispatchReport
    where
        I: IntoIterator<Item = Batch>,
    {
        let start = Instant::now();
        let mut report = DispatchReport::new();
        let mut tasks: JoinSet<BatchReport> = JoinSet::new();

        for batch in batches {
            while let Some(done) = tasks.try_join_next() {
                Self::collect(&mut report, done);
            }

            let permit = match self.acquire(&cancel).await {
                Some(p) => p,
                None => {
                    report.record(cancelled(&batch));
                    continue;
                }
            };

            let publisher = Arc::clone(&self.publisher);
            let retry = self.config.retry.clone();
            let mode = self.config.failure_mode;
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _permit = permit;
                if cancel.is_cancelled() {
                    return cancelled(&batch);
                }
                let outcome = publish_with_retry(&*publisher, &batch, &retry, &cancel).await;
                if outcome.is_failure() && mode == FailureMode::CancelRemaining {
                    cancel.cancel();
                }
                BatchReport {
                    index: batch.index,
                    size: batch.len(),
                    outcome,
                }
            });
        }

        while let Some(done) = tasks.join_next().await {
            Self::collect(&mut report, done);
        }

        report.finish(start.elapsed());
        info!(
            succeeded = report.success_count(),
            failed = report.failure_count(),
            cancelled = report.cancelled_count(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "dispatch complete"
        );
        report
    }

    async fn acquire(&self, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        if cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok(),
        }
    }

    fn collect(
        report: &mut DispatchReport,
        done: std::result::Result<BatchReport, tokio::task::JoinError>,
    ) {
        match done {
            Ok(batch) => report.record(batch),
            Err(e) => {
                warn!(error = %e, "dispatch task did not complete");
                report.lost += 1;
            }
        }
    }
}

fn cancelled(batch: &Batch) -> BatchReport {
    debug!(batch = batch.index, "batch cancelled before start");
    BatchReport {
        index: batch.index,
        size: batch.len(),
        outcome: BatchOutcome::Cancelled,
    }
}

async fn publish_with_retry<P>(
    publisher: &P,
    batch: &Batch,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
) -> BatchOutcome
where
    P: Publisher + ?Sized,
{
    let mut attempt: u32 = 0;
    // Entries still to send once the service accepted part of the batch.
    let mut pending: Option<Batch> = None;
    let mut delivered: Vec<String> = Vec::new();
    let mut receipt = PublishReceipt::default();

    loop {
        let current = pending.as_ref().unwrap_or(batch);
        let error = match publisher.publish_batch(current).await {
            Ok(r) => {
                receipt.message_ids.extend(r.message_ids);
                debug!(batch = batch.index, attempts = attempt + 1, "batch published");
                return BatchOutcome::Succeeded {
                    receipt,
                    attempts: attempt + 1,
                };
            }
            Err(error) => error,
        };

        if let Some(partial) = &error.partial {
            delivered.extend(partial.accepted.iter().cloned());
            receipt.message_ids.extend(partial.message_ids.iter().cloned());
            let rejected: HashSet<&str> = partial.rejected.iter().map(String::as_str).collect();
            let records: Vec<_> = current
                .records
                .iter()
                .filter(|r| rejected.contains(r.id.as_str()))
                .cloned()
                .collect();
            if !records.is_empty() {
                pending = Some(Batch::new(batch.index, records));
            }
        }

        match retry.decide(&error, attempt) {
            Decision::Retry { delay } => {
                debug!(batch = batch.index, attempt, ?delay, error = %error, "retrying batch");
                tokio::select! {
                    _ = cancel.cancelled() => {
                        warn!(
                            batch = batch.index,
                            error = %error,
                            "batch failed, retry abandoned on cancel"
                        );
                        return BatchOutcome::Failed {
                            error,
                            attempts: attempt + 1,
                            delivered,
                            receipt,
                        };
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Decision::Fail => {
                warn!(
                    batch = batch.index,
                    attempts = attempt + 1,
                    delivered = delivered.len(),
                    error = %error,
                    "batch failed"
                );
                return BatchOutcome::Failed {
                    error,
                    attempts: attempt + 1,
                    delivered,
                    receipt,
                };
            }
        }
    }
}
