//! 发布模块：远端批量发布接口及其实现。
//!
//! # Publish Module
//!
//! The [`Publisher`] trait is the seam between the dispatcher and the remote
//! pub/sub service. One call publishes one [`Batch`] as a single request.
//!
//! | Implementation | Description |
//! |----------------|-------------|
//! | [`HttpPublisher`] | JSON `PublishBatch` over HTTP via a shared `reqwest` client |
//! | [`DryRunPublisher`] | Publishes nothing, counts what it would have sent |
//!
//! Implementations are shared read-only across dispatch tasks and must not need
//! external locking.

mod dry_run;
mod error;
mod http;

pub use dry_run::DryRunPublisher;
pub use error::{
    classify_status, is_retryable_error_class, ErrorKind, PartialFailure, PublishError,
};
pub use http::{
    FailedEntry, HttpPublisher, PublishBatchRequest, PublishBatchResponse, PublishEntry,
    SuccessfulEntry,
};

use crate::batch::Batch;
use async_trait::async_trait;
use std::sync::Arc;

/// Identifiers assigned by the remote service for one published batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    pub message_ids: Vec<String>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_batch(&self, batch: &Batch) -> Result<PublishReceipt, PublishError>;
}

#[async_trait]
impl<P> Publisher for Arc<P>
where
    P: Publisher + ?Sized,
{
    async fn publish_batch(&self, batch: &Batch) -> Result<PublishReceipt, PublishError> {
        (**self).publish_batch(batch).await
    }
}
