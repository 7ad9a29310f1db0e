//! Bounded record of executed steps.
//!
//! Some programs never halt, so the log is a ring buffer: once `capacity`
//! entries are held, each new entry evicts the oldest one.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A point-in-time view of one executed step.
///
/// `state`, `head` and `tape_snippet` describe the machine strictly before the
/// step's write took effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// 1-based number of the step attempt.
    pub step: u64,
    pub state: String,
    pub head: i64,
    pub tape_snippet: String,
}

/// Append-only, capacity-bounded execution log.
#[derive(Debug, Clone)]
pub struct ExecutionLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    recorded: u64,
}

impl ExecutionLog {
    /// Creates an empty log. A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            recorded: 0,
        }
    }

    /// Appends an entry, evicting the oldest one when full.
    pub fn record(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.recorded += 1;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recorded = 0;
    }

    /// Entries currently held, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total entries recorded since the last clear, including evicted ones.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Number of entries dropped to stay within capacity.
    pub fn evicted(&self) -> u64 {
        self.recorded - self.entries.len() as u64
    }
}
