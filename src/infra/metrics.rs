//! Lock-free metrics collection and periodic reporting
//!
//! Counter updates on the orchestrator hot path are plain atomics; the
//! per-region tally is the one mutex-guarded map and is only touched on
//! committed entries.
//!
//! NOTE: All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Default)]
pub struct Metrics {
    detections_total: AtomicU64,
    detections_accepted: AtomicU64,
    detections_review: AtomicU64,
    detections_discarded: AtomicU64,
    tickets_issued: AtomicU64,
    tickets_superseded: AtomicU64,
    entries_committed: AtomicU64,
    entries_cancelled: AtomicU64,
    exits: AtomicU64,
    lot_full: AtomicU64,
    gate_commands: AtomicU64,
    revenue_total: AtomicU64,
    /// Gauge, set by the orchestrator after each mutation
    occupied: AtomicU64,
    entries_by_region: Mutex<FxHashMap<String, u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_detection(&self, disposition: &str) {
        self.detections_total.fetch_add(1, Ordering::Relaxed);
        let counter = match disposition {
            "accept" => &self.detections_accepted,
            "review" => &self.detections_review,
            _ => &self.detections_discarded,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ticket_issued(&self) {
        self.tickets_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ticket_superseded(&self) {
        self.tickets_superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_entry_committed(&self, region: &str) {
        self.entries_committed.fetch_add(1, Ordering::Relaxed);
        let mut by_region = self.entries_by_region.lock();
        *by_region.entry(region.to_string()).or_insert(0) += 1;
    }

    pub fn record_entry_cancelled(&self) {
        self.entries_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exit(&self, amount: u64) {
        self.exits.fetch_add(1, Ordering::Relaxed);
        self.revenue_total.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn record_lot_full(&self) {
        self.lot_full.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gate_command(&self) {
        self.gate_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_occupied(&self, count: u64) {
        self.occupied.store(count, Ordering::Relaxed);
    }

    pub fn revenue_total(&self) -> u64 {
        self.revenue_total.load(Ordering::Relaxed)
    }

    /// Snapshot the counters for reporting
    pub fn report(&self) -> MetricsSummary {
        let by_region: Vec<(String, u64)> = {
            let map = self.entries_by_region.lock();
            let mut pairs: Vec<_> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
            pairs.sort_by(|a, b| b.1.cmp(&a.1));
            pairs
        };

        MetricsSummary {
            detections_total: self.detections_total.load(Ordering::Relaxed),
            detections_accepted: self.detections_accepted.load(Ordering::Relaxed),
            detections_review: self.detections_review.load(Ordering::Relaxed),
            detections_discarded: self.detections_discarded.load(Ordering::Relaxed),
            tickets_issued: self.tickets_issued.load(Ordering::Relaxed),
            tickets_superseded: self.tickets_superseded.load(Ordering::Relaxed),
            entries_committed: self.entries_committed.load(Ordering::Relaxed),
            entries_cancelled: self.entries_cancelled.load(Ordering::Relaxed),
            exits: self.exits.load(Ordering::Relaxed),
            lot_full: self.lot_full.load(Ordering::Relaxed),
            gate_commands: self.gate_commands.load(Ordering::Relaxed),
            revenue_total: self.revenue_total.load(Ordering::Relaxed),
            occupied: self.occupied.load(Ordering::Relaxed),
            entries_by_region: by_region,
        }
    }
}

/// Point-in-time counter snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub detections_total: u64,
    pub detections_accepted: u64,
    pub detections_review: u64,
    pub detections_discarded: u64,
    pub tickets_issued: u64,
    pub tickets_superseded: u64,
    pub entries_committed: u64,
    pub entries_cancelled: u64,
    pub exits: u64,
    pub lot_full: u64,
    pub gate_commands: u64,
    pub revenue_total: u64,
    pub occupied: u64,
    pub entries_by_region: Vec<(String, u64)>,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            occupied = %self.occupied,
            detections = %self.detections_total,
            accepted = %self.detections_accepted,
            review = %self.detections_review,
            discarded = %self.detections_discarded,
            tickets = %self.tickets_issued,
            superseded = %self.tickets_superseded,
            entries = %self.entries_committed,
            cancelled = %self.entries_cancelled,
            exits = %self.exits,
            lot_full = %self.lot_full,
            gate_commands = %self.gate_commands,
            revenue = %self.revenue_total,
            regions = ?self.entries_by_region,
            "metrics_summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_counters() {
        let metrics = Metrics::new();
        metrics.record_detection("accept");
        metrics.record_detection("review");
        metrics.record_detection("discard");
        metrics.record_detection("discard");

        let summary = metrics.report();
        assert_eq!(summary.detections_total, 4);
        assert_eq!(summary.detections_accepted, 1);
        assert_eq!(summary.detections_review, 1);
        assert_eq!(summary.detections_discarded, 2);
    }

    #[test]
    fn test_revenue_accumulates() {
        let metrics = Metrics::new();
        metrics.record_exit(2000);
        metrics.record_exit(4000);

        assert_eq!(metrics.revenue_total(), 6000);
        assert_eq!(metrics.report().exits, 2);
    }

    #[test]
    fn test_entries_by_region_sorted_by_count() {
        let metrics = Metrics::new();
        metrics.record_entry_committed("بغداد");
        metrics.record_entry_committed("بغداد");
        metrics.record_entry_committed("أربيل");

        let summary = metrics.report();
        assert_eq!(summary.entries_by_region[0], ("بغداد".to_string(), 2));
        assert_eq!(summary.entries_by_region[1], ("أربيل".to_string(), 1));
    }

    #[test]
    fn test_occupied_gauge_overwrites() {
        let metrics = Metrics::new();
        metrics.set_occupied(7);
        metrics.set_occupied(3);
        assert_eq!(metrics.report().occupied, 3);
    }
}
