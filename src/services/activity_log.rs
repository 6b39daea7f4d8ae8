//! Activity log - append-only ledger of entry/exit events
//!
//! In-memory view is newest-first and capped; durable history, when
//! configured, lives in the store's JSONL ledger.

use crate::domain::types::{ActivityEntry, ActivityKind};
use std::collections::VecDeque;

pub struct ActivityLog {
    /// Newest first
    entries: VecDeque<ActivityEntry>,
    cap: usize,
}

impl ActivityLog {
    pub fn new(cap: usize) -> Self {
        Self { entries: VecDeque::with_capacity(cap), cap }
    }

    /// Seed from persisted history (oldest-first input, as the store returns it)
    pub fn from_history(history: Vec<ActivityEntry>, cap: usize) -> Self {
        let mut log = Self::new(cap);
        for entry in history {
            log.append(entry);
        }
        log
    }

    pub fn append(&mut self, entry: ActivityEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.cap);
    }

    /// Most recent entries, newest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter().take(n)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of exit charges currently in the window
    pub fn total_revenue(&self) -> u64 {
        self.entries.iter().filter_map(|e| e.amount).sum()
    }

    pub fn exit_count(&self) -> usize {
        self.entries.iter().filter(|e| e.kind == ActivityKind::Exit).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let mut log = ActivityLog::new(10);
        log.append(ActivityEntry::entry("tkt-1", "11-11111", 100));
        log.append(ActivityEntry::exit("11-11111", 2000, 200));

        let recent: Vec<_> = log.recent(2).collect();
        assert_eq!(recent[0].kind, ActivityKind::Exit);
        assert_eq!(recent[1].kind, ActivityKind::Entry);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut log = ActivityLog::new(3);
        for i in 0..5 {
            log.append(ActivityEntry::entry(&format!("tkt-{i}"), "11-11111", i));
        }

        assert_eq!(log.len(), 3);
        let ids: Vec<_> = log.entries().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["tkt-4", "tkt-3", "tkt-2"]);
    }

    #[test]
    fn test_revenue_and_exit_count() {
        let mut log = ActivityLog::new(10);
        log.append(ActivityEntry::entry("tkt-1", "11-11111", 100));
        log.append(ActivityEntry::exit("11-11111", 2000, 200));
        log.append(ActivityEntry::exit("21-22222", 4000, 300));

        assert_eq!(log.total_revenue(), 6000);
        assert_eq!(log.exit_count(), 2);
    }

    #[test]
    fn test_from_history_keeps_latest() {
        let history: Vec<_> =
            (0..5).map(|i| ActivityEntry::entry(&format!("tkt-{i}"), "11-11111", i)).collect();
        let log = ActivityLog::from_history(history, 2);

        let ids: Vec<_> = log.entries().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["tkt-4", "tkt-3"]);
    }
}
