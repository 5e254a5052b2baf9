//! 批处理模块：将消息序列切分为固定大小的批次。
//!
//! # Batching Module
//!
//! This module partitions a stream of [`Record`](crate::message::Record)s into
//! fixed-size [`Batch`]es, each of which is later published with a single remote
//! call.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchCollector`] | Single-owner accumulator that reports when a batch is full |
//! | [`BatchConfig`] | Batch size and trailing-remainder policy |
//! | [`Batches`] | Lazy iterator adapter yielding numbered batches |
//! | [`RemainderPolicy`] | Whether a trailing partial batch is flushed or dropped |
//!
//! ## Example
//!
//! ```rust
//! use batch_publisher::batch::{BatchConfig, IntoBatches, RemainderPolicy};
//! use batch_publisher::message::MessageGenerator;
//!
//! let config = BatchConfig::new()
//!     .with_max_batch_size(10)
//!     .with_remainder(RemainderPolicy::Flush);
//! let sizes: Vec<usize> = MessageGenerator::new(25)
//!     .batches(&config)
//!     .map(|b| b.len())
//!     .collect();
//! assert_eq!(sizes, vec![10, 10, 5]);
//! ```
//!
//! ## Remainder policies
//!
//! - **Flush**: the final partial batch is dispatched (every record is published)
//! - **Drop**: the final partial batch is discarded and counted

mod batches;
mod collector;

pub use batches::{Batches, IntoBatches};
pub use collector::{BatchAddResult, BatchCollector};

use crate::message::Record;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Per-request entry limit of the remote PublishBatch API.
pub const MAX_BATCH_ENTRIES: usize = 10;

/// An ordered group of records published in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 0-based sequence number in generation order.
    pub index: usize,
    pub records: Vec<Record>,
}

impl Batch {
    pub fn new(index: usize, records: Vec<Record>) -> Self {
        Self { index, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemainderPolicy {
    #[default]
    Flush,
    Drop,
}

impl FromStr for RemainderPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flush" => Ok(RemainderPolicy::Flush),
            "drop" => Ok(RemainderPolicy::Drop),
            other => Err(Error::configuration_with_context(
                format!("unknown remainder policy '{}'", other),
                ErrorContext::new()
                    .with_field_path("batch.remainder")
                    .with_details("expected 'flush' or 'drop'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub max_batch_size: usize,
    pub remainder: RemainderPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_ENTRIES,
            remainder: RemainderPolicy::default(),
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_batch_size(mut self, s: usize) -> Self {
        self.max_batch_size = s;
        self
    }

    pub fn with_remainder(mut self, r: RemainderPolicy) -> Self {
        self.remainder = r;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 || self.max_batch_size > MAX_BATCH_ENTRIES {
            return Err(Error::validation_with_context(
                "batch size out of range",
                ErrorContext::new()
                    .with_field_path("batch.max_batch_size")
                    .with_details(format!(
                        "got {}, expected 1..={}",
                        self.max_batch_size, MAX_BATCH_ENTRIES
                    ))
                    .with_source("batch_config"),
            ));
        }
        Ok(())
    }
}
