use std::collections::VecDeque;
use std::sync::Arc;

use tails_types::{ArcLogLine, LogLine};

/// Ring buffer holding the tail of the stream
///
/// Owned by a single consumer; lines are handed out as `Arc`s so rendering
/// never copies text.
#[derive(Clone, Debug)]
pub struct LogBuffer {
    /// Internal storage, oldest first
    entries: VecDeque<ArcLogLine>,

    /// Maximum capacity
    capacity: usize,

    /// Next line ID
    next_id: u64,

    /// Lines dropped by eviction since creation or the last clear
    evicted: u64,
}

impl LogBuffer {
    /// Create a new log buffer with the given capacity (at least one line)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            next_id: 0,
            evicted: 0,
        }
    }

    /// Append a line, evicting the oldest if at capacity
    pub fn push(&mut self, text: String) -> ArcLogLine {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }

        let line = Arc::new(LogLine::new(self.next_id, text));
        self.next_id += 1;
        self.entries.push_back(Arc::clone(&line));
        line
    }

    /// Get all entries (Arc clones are cheap)
    pub fn all(&self) -> Vec<ArcLogLine> {
        self.entries.iter().cloned().collect()
    }

    /// Get entries matching a predicate, in arrival order
    pub fn filtered<F>(&self, predicate: F) -> Vec<ArcLogLine>
    where
        F: Fn(&LogLine) -> bool,
    {
        self.entries
            .iter()
            .filter(|line| predicate(line))
            .cloned()
            .collect()
    }

    /// Iterate over entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ArcLogLine> {
        self.entries.iter()
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

    /// Number of lines evicted to make room
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Total lines ever pushed (IDs keep counting across evictions)
    pub fn total_pushed(&self) -> u64 {
        self.next_id
    }

    /// Clear all entries. IDs keep increasing so renderers never see a reused key.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.evicted = 0;
    }

    /// Get the last N entries
    pub fn tail(&self, n: usize) -> Vec<ArcLogLine> {
        let start = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(start).cloned().collect()
    }

    /// Get entries in a range (for windowed rendering)
    pub fn range(&self, start: usize, count: usize) -> Vec<ArcLogLine> {
        self.entries.iter().skip(start).take(count).cloned().collect()
    }
}
