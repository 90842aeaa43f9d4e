//! Per-engine counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters of one engine instance
#[derive(Debug, Default)]
pub struct EngineStats {
    polls_ok: AtomicU64,
    polls_failed: AtomicU64,
    push_fallbacks: AtomicU64,
    refresh_rejected: AtomicU64,
    events_emitted: AtomicU64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inc_polls_ok(&self) {
        self.polls_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_polls_failed(&self) {
        self.polls_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_push_fallbacks(&self) {
        self.push_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_refresh_rejected(&self) {
        self.refresh_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_events_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            polls_ok: self.polls_ok.load(Ordering::Relaxed),
            polls_failed: self.polls_failed.load(Ordering::Relaxed),
            push_fallbacks: self.push_fallbacks.load(Ordering::Relaxed),
            refresh_rejected: self.refresh_rejected.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of engine counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub polls_ok: u64,
    pub polls_failed: u64,
    pub push_fallbacks: u64,
    pub refresh_rejected: u64,
    pub events_emitted: u64,
}

impl StatsSnapshot {
    pub fn polls(&self) -> u64 {
        self.polls_ok + self.polls_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = EngineStats::new();
        stats.inc_polls_ok();
        stats.inc_polls_ok();
        stats.inc_polls_failed();
        stats.inc_events_emitted();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.polls(), 3);
        assert_eq!(snapshot.events_emitted, 1);
        assert_eq!(snapshot.push_fallbacks, 0);
    }
}
