//! Synthetic message generation.
//!
//! [`MessageGenerator`] is a lazy, finite iterator of [`Record`]s. It is consumed
//! by value, so a generator cannot be restarted once drained.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload carried by every generated record unless overridden.
pub const DEFAULT_PAYLOAD: &str = "Hello world";

/// A single message to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub payload: String,
}

impl Record {
    pub fn new(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }
}

/// Produces exactly `count` records, each with a fresh UUID v4 identifier.
#[derive(Debug)]
pub struct MessageGenerator {
    remaining: usize,
    payload: String,
}

impl MessageGenerator {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: count,
            payload: DEFAULT_PAYLOAD.to_string(),
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Iterator for MessageGenerator {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(Record {
            id: Uuid::new_v4().to_string(),
            payload: self.payload.clone(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for MessageGenerator {}

impl std::iter::FusedIterator for MessageGenerator {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generates_exact_count() {
        for n in [0usize, 1, 9, 10, 25, 1000] {
            let records: Vec<Record> = MessageGenerator::new(n).collect();
            assert_eq!(records.len(), n, "count mismatch for n={}", n);
        }
    }

    #[test]
    fn test_ids_are_distinct_uuids() {
        let ids: HashSet<String> = MessageGenerator::new(5_000).map(|r| r.id).collect();
        assert_eq!(ids.len(), 5_000);
        for id in ids.iter().take(10) {
            assert!(Uuid::parse_str(id).is_ok(), "not a uuid: {}", id);
        }
    }

    #[test]
    fn test_default_and_custom_payload() {
        let r = MessageGenerator::new(1).next().unwrap();
        assert_eq!(r.payload, DEFAULT_PAYLOAD);

        let r = MessageGenerator::new(1).with_payload("ping").next().unwrap();
        assert_eq!(r.payload, "ping");
    }

    #[test]
    fn test_exhausted_generator_stays_empty() {
        let mut gen = MessageGenerator::new(2);
        assert_eq!(gen.len(), 2);
        gen.next();
        gen.next();
        assert_eq!(gen.remaining(), 0);
        assert!(gen.next().is_none());
        assert!(gen.next().is_none());
    }
}
