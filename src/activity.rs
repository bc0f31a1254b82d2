//! Bounded activity log
//!
//! Keeps the most recent human-visible events (confusion, help, resets, session
//! completion) for display. Oldest entries are dropped once the capacity is
//! exceeded. Never persisted.

use crate::types::{LogEntry, Severity};
use chrono::Utc;
use std::collections::VecDeque;

/// Default number of entries retained
pub const DEFAULT_LOG_CAPACITY: usize = 20;

/// Ring buffer of [`LogEntry`] values, oldest first
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest ones beyond capacity
    pub fn push(&mut self, action: impl Into<String>, section: impl Into<String>, severity: Severity) {
        self.entries.push_back(LogEntry {
            action: action.into(),
            section: section.into(),
            severity,
            at: Utc::now(),
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Entries from oldest to newest
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Entries from newest to oldest, the order a feed displays them in
    pub fn recent(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().rev()
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

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_beyond_capacity() {
        let mut log = ActivityLog::new(3);
        for i in 0..5 {
            log.push(format!("event-{i}"), "System", Severity::Info);
        }

        assert_eq!(log.len(), 3);
        let actions: Vec<&str> = log.entries().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["event-2", "event-3", "event-4"]);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut log = ActivityLog::default();
        log.push("Confusion Detected", "summary", Severity::Warning);
        log.push("Help Shown", "summary", Severity::Success);

        let first = log.recent().next().unwrap();
        assert_eq!(first.action, "Help Shown");
        assert_eq!(first.severity, Severity::Success);
        assert_eq!(log.latest().unwrap().action, "Help Shown");
    }

    #[test]
    fn test_default_capacity() {
        let mut log = ActivityLog::default();
        for _ in 0..(DEFAULT_LOG_CAPACITY + 7) {
            log.push("Help Shown", "items", Severity::Success);
        }
        assert_eq!(log.len(), DEFAULT_LOG_CAPACITY);

        log.clear();
        assert!(log.is_empty());
    }
}
