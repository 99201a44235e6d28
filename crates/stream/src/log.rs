//! Deduplicating, timestamp-ordered message log.

use std::collections::HashSet;

use council_core::{EntryKey, LogEntry};

/// Append-only log of participant messages.
///
/// Entries are unique by `(participant_id, text, occurred_at)` and kept in
/// `occurred_at` order; entries with equal timestamps stay in arrival order.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<LogEntry>,
    seen: HashSet<EntryKey>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the entry was already present.
    pub fn append(&mut self, entry: LogEntry) -> bool {
        if !self.seen.insert(entry.key()) {
            return false;
        }

        // Insert after every entry with an equal or earlier timestamp.
        let at = self
            .entries
            .partition_point(|existing| existing.occurred_at <= entry.occurred_at);
        self.entries.insert(at, entry);
        true
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(agent: &str, text: &str, ms: i64) -> LogEntry {
        LogEntry::new(agent, text, "info", Utc.timestamp_millis_opt(ms).unwrap())
    }

    #[test]
    fn test_duplicate_append_is_noop() {
        let mut log = MessageLog::new();
        assert!(log.append(entry("A", "m1", 100)));
        assert!(!log.append(entry("A", "m1", 100)));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_out_of_order_delivery_is_sorted() {
        let mut log = MessageLog::new();
        log.append(entry("A", "three", 3));
        log.append(entry("A", "one", 1));
        log.append(entry("A", "two", 2));

        let texts: Vec<&str> = log.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let mut log = MessageLog::new();
        log.append(entry("bull", "first", 10));
        log.append(entry("bear", "second", 10));
        log.append(entry("lead", "earlier", 5));
        log.append(entry("bull", "third", 10));

        let texts: Vec<&str> = log.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["earlier", "first", "second", "third"]);
    }

    #[test]
    fn test_same_text_from_different_agents_is_kept() {
        let mut log = MessageLog::new();
        log.append(entry("bull", "Agreed.", 7));
        log.append(entry("bear", "Agreed.", 7));
        assert_eq!(log.len(), 2);
    }
}
