//! Bounded cache of recent lines.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::line::LogLine;

/// Number of lines kept when no capacity is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Fixed-capacity buffer of the most recent lines, oldest evicted first.
#[derive(Debug, Clone)]
pub struct LineCache {
    lines: VecDeque<Arc<LogLine>>,
    capacity: usize,
}

impl LineCache {
    /// Create a cache holding at most `capacity` lines (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, evicting the oldest one when full.
    pub fn push(&mut self, line: Arc<LogLine>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<LogLine>> {
        self.lines.iter()
    }

    /// Copy out the current contents, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<LogLine>> {
        self.lines.iter().cloned().collect()
    }
}

impl Default for LineCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
