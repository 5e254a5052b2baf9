//! # batch-publisher
//!
//! 生成合成消息并以有界并发的批次发布到发布/订阅主题。
//!
//! Generate synthetic messages and publish them to a pub/sub topic in fixed-size
//! batches, with a bounded number of batches in flight.
//!
//! ## Overview
//!
//! A run has three stages:
//!
//! - **Generate**: [`MessageGenerator`] lazily yields records with unique ids
//! - **Batch**: [`batch::IntoBatches`] groups records into batches of up to
//!   [`batch::MAX_BATCH_ENTRIES`]
//! - **Dispatch**: [`BatchDispatcher`] publishes each batch on its own task,
//!   at most `max_inflight` at a time, and joins them all into a [`DispatchReport`]
//!
//! Every batch ends in a typed outcome (succeeded, failed or cancelled). A
//! failed batch never hides the status of batches that already completed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batch_publisher::{runner, HttpPublisher, PublisherConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> batch_publisher::Result<()> {
//!     let config = PublisherConfig::load(None)?;
//!     let publisher = Arc::new(HttpPublisher::from_config(&config)?);
//!
//!     let summary = runner::run(&config, publisher).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`message`] | Record type and synthetic generator |
//! | [`batch`] | Partitioning records into batches |
//! | [`dispatch`] | Bounded concurrent dispatch, retry policy, reports |
//! | [`publish`] | Publisher trait, HTTP and dry-run publishers |
//! | [`transport`] | HTTP client tuning and credential lookup |
//! | [`config`] | Layered configuration (YAML, environment) |
//! | [`runner`] | End-to-end run wiring |

pub mod batch;
pub mod config;
pub mod dispatch;
pub mod message;
pub mod publish;
pub mod runner;
pub mod transport;

pub use batch::{Batch, BatchConfig, RemainderPolicy};
pub use config::PublisherConfig;
pub use dispatch::{
    BatchDispatcher, BatchOutcome, DispatchReport, DispatcherConfig, FailureMode, RetryPolicy,
};
pub use message::{MessageGenerator, Record};
pub use publish::{DryRunPublisher, HttpPublisher, PublishError, PublishReceipt, Publisher};
pub use runner::RunSummary;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
