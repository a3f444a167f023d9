//! Run statistics for the sampler and the tick loop.
//!
//! The background sampler updates these from its own thread; the orchestrator
//! reads them once at the end of a run to log a summary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::process::SkipReason;

/// Totals over the completed sampler cycles.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct CycleSummary {
    pub cycles: u64,
    /// Distinct process names in the most recent snapshot.
    pub last_names: usize,
    pub peak_names: usize,
    pub total_scan_ms: f64,
    pub slowest_scan_ms: f64,
}

impl CycleSummary {
    fn push(&mut self, names: usize, scan_ms: f64) {
        self.cycles += 1;
        self.last_names = names;
        self.peak_names = self.peak_names.max(names);
        self.total_scan_ms += scan_ms;
        self.slowest_scan_ms = self.slowest_scan_ms.max(scan_ms);
    }

    pub fn mean_scan_ms(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.total_scan_ms / self.cycles as f64
        }
    }
}

/// Counters maintained by the background sampler.
#[derive(Default, Debug)]
pub struct SamplerStats {
    pub skipped_vanished: AtomicU64,
    pub skipped_denied: AtomicU64,
    pub skipped_malformed: AtomicU64,
    pub skipped_other: AtomicU64,
    cycles: Mutex<CycleSummary>,
}

impl SamplerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one finished scan that produced `names` distinct names.
    pub fn record_cycle(&self, names: usize, scan_ms: f64) {
        match self.cycles.lock() {
            Ok(mut summary) => summary.push(names, scan_ms),
            Err(poisoned) => poisoned.into_inner().push(names, scan_ms),
        }
    }

    pub fn record_skip(&self, reason: SkipReason) {
        let counter = match reason {
            SkipReason::Vanished => &self.skipped_vanished,
            SkipReason::AccessDenied => &self.skipped_denied,
            SkipReason::Malformed => &self.skipped_malformed,
            SkipReason::Other => &self.skipped_other,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> CycleSummary {
        match self.cycles.lock() {
            Ok(summary) => *summary,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn cycles(&self) -> u64 {
        self.summary().cycles
    }

    pub fn skipped_total(&self) -> u64 {
        self.skipped_vanished.load(Ordering::Relaxed)
            + self.skipped_denied.load(Ordering::Relaxed)
            + self.skipped_malformed.load(Ordering::Relaxed)
            + self.skipped_other.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary_has_zero_mean() {
        let stats = SamplerStats::new();
        assert_eq!(stats.summary(), CycleSummary::default());
        assert_eq!(stats.summary().mean_scan_ms(), 0.0);
    }

    #[test]
    fn test_sampler_stats_counts_skips_by_reason() {
        let stats = SamplerStats::new();
        stats.record_skip(SkipReason::Vanished);
        stats.record_skip(SkipReason::Vanished);
        stats.record_skip(SkipReason::AccessDenied);
        stats.record_skip(SkipReason::Malformed);

        assert_eq!(stats.skipped_vanished.load(Ordering::Relaxed), 2);
        assert_eq!(stats.skipped_total(), 4);
    }

    #[test]
    fn test_record_cycle_tracks_names_and_scan_time() {
        let stats = SamplerStats::new();
        stats.record_cycle(120, 3.5);
        stats.record_cycle(80, 2.5);

        let summary = stats.summary();
        assert_eq!(stats.cycles(), 2);
        assert_eq!(summary.last_names, 80);
        assert_eq!(summary.peak_names, 120);
        assert_eq!(summary.slowest_scan_ms, 3.5);
        assert_eq!(summary.mean_scan_ms(), 3.0);
    }
}
