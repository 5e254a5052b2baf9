//! End-to-end run: generate, batch, dispatch, join.

use crate::batch::IntoBatches;
use crate::config::PublisherConfig;
use crate::dispatch::{BatchDispatcher, DispatchReport};
use crate::message::MessageGenerator;
use crate::publish::Publisher;
use crate::Result;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Outcome of a full run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub generated: usize,
    /// Trailing records discarded under `RemainderPolicy::Drop`.
    pub dropped: usize,
    pub report: DispatchReport,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.report.all_succeeded()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} records generated; {}", self.generated, self.report)?;
        if self.dropped > 0 {
            write!(f, "; {} trailing records dropped", self.dropped)?;
        }
        Ok(())
    }
}

pub async fn run<P>(config: &PublisherConfig, publisher: Arc<P>) -> Result<RunSummary>
where
    P: Publisher + 'static,
{
    run_with_cancel(config, publisher, CancellationToken::new()).await
}

/// Validate `config`, then publish `config.message_count` generated records.
pub async fn run_with_cancel<P>(
    config: &PublisherConfig,
    publisher: Arc<P>,
    cancel: CancellationToken,
) -> Result<RunSummary>
where
    P: Publisher + 'static,
{
    config.validate()?;

    info!(
        topic = %config.topic,
        messages = config.message_count,
        batch_size = config.batch.max_batch_size,
        max_inflight = config.dispatch.max_inflight,
        remainder = ?config.batch.remainder,
        "starting publish run"
    );

    let dispatcher = BatchDispatcher::new(publisher, config.dispatch.clone());
    let generator =
        MessageGenerator::new(config.message_count).with_payload(config.payload.clone());
    let mut batches = generator.batches(&config.batch);

    let report = dispatcher
        .dispatch_all_with_cancel(batches.by_ref(), cancel)
        .await;

    let dropped = batches.dropped();
    if dropped > 0 {
        warn!(dropped, "trailing partial batch was not published");
    }

    Ok(RunSummary {
        generated: config.message_count,
        dropped,
        report,
    })
}
