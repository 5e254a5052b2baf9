use crate::publish::PublishError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do after a failed publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry { delay: Duration },
    Fail,
}

/// Retry policy for transient publish failures.
///
/// The default performs no retries: a failed call is reported as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            min_delay_ms: 100,
            max_delay_ms: 5_000,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_delays(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay_ms = millis(min);
        self.max_delay_ms = millis(max.max(min));
        self
    }

    fn backoff_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        // exponential backoff: min_delay * 2^attempt
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let base = self.min_delay_ms.saturating_mul(factor);
        let chosen = retry_after
            .map(millis)
            .unwrap_or(base)
            .min(self.max_delay_ms);
        Duration::from_millis(chosen)
    }

    /// Decide what to do after `attempt` (0-based) failed with `err`.
    pub fn decide(&self, err: &PublishError, attempt: u32) -> Decision {
        if err.is_retryable() && attempt < self.max_retries {
            Decision::Retry {
                delay: self.backoff_delay(attempt, err.retry_after),
            }
        } else {
            Decision::Fail
        }
    }
}
