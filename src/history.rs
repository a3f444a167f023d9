//! Per-process traffic history over the observation window.

use ahash::AHashMap as HashMap;

use crate::snapshot::Snapshot;

/// Bits in one megabit (decimal).
const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Non-negative traffic since the previous snapshot.
///
/// A name missing from the previous snapshot had no prior traffic, so the whole
/// current total counts. A total that went backwards (counter reset, or the name
/// now belongs to a different process) clamps to zero.
pub fn traffic_delta(previous: Option<u64>, current: u64) -> u64 {
    current.saturating_sub(previous.unwrap_or(0))
}

/// Converts a byte count observed over one second into megabits per second.
pub fn bytes_to_megabits(bytes: u64) -> f64 {
    (bytes as f64 * 8.0) / BITS_PER_MEGABIT
}

/// What a single tick contributed to the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Names present in the current snapshot.
    pub names: usize,
    /// Names seen for the first time at this tick.
    pub new_names: usize,
    /// Sum of all deltas at this tick, in bytes.
    pub total_bytes: u64,
}

/// Name to per-tick rate series (Mb/s).
///
/// Every series has `duration + 1` slots; slot 0 is reserved and stays zero.
/// Series are kept in first-seen order and never removed.
#[derive(Debug, Clone, Default)]
pub struct History {
    duration: usize,
    index: HashMap<String, usize>,
    series: Vec<(String, Vec<f64>)>,
}

impl History {
    pub fn new(duration: usize) -> Self {
        Self {
            duration,
            index: HashMap::new(),
            series: Vec::new(),
        }
    }

    pub fn duration(&self) -> usize {
        self.duration
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Writes `value` into slot `tick` of `name`, creating a zero-filled series
    /// on first sight. Returns `true` when the name was new.
    pub fn record(&mut self, name: &str, tick: usize, value: f64) -> bool {
        if tick == 0 || tick > self.duration {
            return false;
        }

        let (slot, created) = match self.index.get(name) {
            Some(&i) => (i, false),
            None => {
                let i = self.series.len();
                self.series
                    .push((name.to_string(), vec![0.0; self.duration + 1]));
                self.index.insert(name.to_string(), i);
                (i, true)
            }
        };
        self.series[slot].1[tick] = value;
        created
    }

    /// Records the deltas between two consecutive snapshots at `tick`.
    ///
    /// Names only present in `previous` contribute nothing; their slot for this
    /// tick stays zero.
    pub fn record_tick(
        &mut self,
        tick: usize,
        previous: &Snapshot,
        current: &Snapshot,
    ) -> TickSummary {
        let mut summary = TickSummary {
            names: current.len(),
            ..TickSummary::default()
        };
        for (name, &total) in current {
            let delta = traffic_delta(previous.get(name).copied(), total);
            summary.total_bytes = summary.total_bytes.saturating_add(delta);
            if self.record(name, tick, bytes_to_megabits(delta)) {
                summary.new_names += 1;
            }
        }
        summary
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.index.get(name).map(|&i| self.series[i].1.as_slice())
    }

    /// Series in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.series.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(pairs: &[(&str, u64)]) -> Snapshot {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_traffic_delta_clamps_negative_to_zero() {
        assert_eq!(traffic_delta(Some(500), 200), 0);
        assert_eq!(traffic_delta(Some(200), 500), 300);
        assert_eq!(traffic_delta(Some(7), 7), 0);
    }

    #[test]
    fn test_traffic_delta_unseen_name_counts_full_total() {
        assert_eq!(traffic_delta(None, 1234), 1234);
    }

    #[test]
    fn test_bytes_to_megabits() {
        assert_eq!(bytes_to_megabits(125_000), 1.0);
        assert_eq!(bytes_to_megabits(0), 0.0);
        assert!((bytes_to_megabits(62_500) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_new_name_is_zero_filled_before_first_tick() {
        let mut h = History::new(5);
        h.record_tick(1, &snap(&[]), &snap(&[("a", 125_000)]));
        h.record_tick(2, &snap(&[("a", 125_000)]), &snap(&[("a", 250_000)]));
        h.record_tick(
            3,
            &snap(&[("a", 250_000)]),
            &snap(&[("a", 250_000), ("late", 250_000)]),
        );

        assert_eq!(h.get("late").unwrap(), &[0.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        assert_eq!(h.get("a").unwrap(), &[0.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_vanished_name_keeps_slot_at_zero() {
        let mut h = History::new(3);
        h.record_tick(1, &snap(&[("a", 0)]), &snap(&[("a", 125_000)]));
        let s = h.record_tick(2, &snap(&[("a", 125_000)]), &snap(&[]));

        assert_eq!(s.names, 0);
        assert_eq!(h.len(), 1);
        assert_eq!(h.get("a").unwrap(), &[0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_counter_reset_records_zero() {
        let mut h = History::new(2);
        let s = h.record_tick(1, &snap(&[("a", 9_000)]), &snap(&[("a", 10)]));
        assert_eq!(s.total_bytes, 0);
        assert_eq!(h.get("a").unwrap()[1], 0.0);
    }

    #[test]
    fn test_record_tick_summary() {
        let mut h = History::new(2);
        let s = h.record_tick(
            1,
            &snap(&[("a", 100)]),
            &snap(&[("a", 150), ("b", 20)]),
        );
        assert_eq!(
            s,
            TickSummary {
                names: 2,
                new_names: 2,
                total_bytes: 70
            }
        );
        let s = h.record_tick(2, &snap(&[("a", 150), ("b", 20)]), &snap(&[("a", 160)]));
        assert_eq!(s.new_names, 0);
        assert_eq!(s.total_bytes, 10);
    }

    #[test]
    fn test_iter_preserves_first_seen_order() {
        let mut h = History::new(2);
        h.record("zeta", 1, 1.0);
        h.record("alpha", 1, 1.0);
        h.record("zeta", 2, 3.0);

        let names: Vec<&str> = h.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
