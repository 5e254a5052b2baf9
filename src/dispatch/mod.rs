//! 分发模块：以有界并发将批次发布到远端主题。
//!
//! # Dispatch Module
//!
//! [`BatchDispatcher`] takes a sequence of [`Batch`](crate::batch::Batch)es and
//! publishes each one on its own task, with at most `max_inflight` tasks
//! running at a time. Every batch ends in exactly one [`BatchOutcome`], and
//! the final [`DispatchReport`] is produced only after all tasks have finished.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchDispatcher`] | Permit-bounded fan-out with a final join |
//! | [`DispatcherConfig`] | Permit pool size, failure mode, retry policy |
//! | [`RetryPolicy`] | Retries transient errors with exponential backoff |
//! | [`DispatchReport`] | Per-batch outcomes plus succeeded/failed/cancelled counts |
//!
//! ## Failure modes
//!
//! - **Continue**: failures are recorded, remaining batches are still sent
//! - **CancelRemaining**: the first failure cancels batches that have not started
//!
//! No ordering is guaranteed between batches. Reports are sorted by batch index
//! for presentation only.

mod dispatcher;
pub mod policy;
mod report;
pub mod signals;

pub use dispatcher::{BatchDispatcher, DispatcherConfig, FailureMode, DEFAULT_MAX_INFLIGHT};
pub use policy::{Decision, RetryPolicy};
pub use report::{BatchOutcome, BatchReport, DispatchReport};
pub use signals::InflightSnapshot;
