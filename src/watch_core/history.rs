//! Rolling per-item price history with on-demand statistics
//!
//! Each item keeps an ordered series of (timestamp, price) samples bounded
//! both by age and by count. Statistics are recomputed at read time rather
//! than maintained incrementally; windows hold tens to low hundreds of
//! samples, so the O(n) aggregation is not worth optimizing away.
//!
//! State is process-lifetime only. Nothing here is persisted.

use std::collections::{HashMap, VecDeque};

/// Aggregated metrics for one item's window.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceStats {
    pub average: f64,
    /// Population standard deviation (squared-deviation sum over count).
    pub stddev: f64,
    pub count: usize,
}

/// Per-item rolling price series, bounded by window horizon and point cap.
pub struct PriceHistory {
    window_secs: f64,
    max_points: usize,
    series: HashMap<String, VecDeque<(f64, f64)>>,
    now_fn: Box<dyn Fn() -> f64 + Send + Sync>,
}

impl PriceHistory {
    pub fn new(window_minutes: u64, max_points: usize) -> Self {
        Self::with_now_fn(window_minutes, max_points, Box::new(now_epoch))
    }

    /// Deterministic clock injection for tests.
    pub fn with_now_fn(
        window_minutes: u64,
        max_points: usize,
        now_fn: Box<dyn Fn() -> f64 + Send + Sync>,
    ) -> Self {
        Self {
            window_secs: (window_minutes.max(1) * 60) as f64,
            max_points: max_points.max(10),
            series: HashMap::new(),
            now_fn,
        }
    }

    /// Append a sample for `item_id`, then trim the window.
    ///
    /// `observed_at` is epoch seconds; when the source could not resolve an
    /// observation time it defaults to now. Age trim first, count trim last,
    /// oldest evicted first in both cases.
    pub fn add(&mut self, item_id: &str, price: f64, observed_at: Option<f64>) {
        let ts = observed_at.unwrap_or_else(|| (self.now_fn)());
        let series = self.series.entry(item_id.to_string()).or_default();
        series.push_back((ts, price));
        trim(series, ts, self.window_secs, self.max_points);
    }

    /// Aggregate the item's window into [`PriceStats`].
    ///
    /// The age trim is re-applied against the current clock so stats reflect
    /// "now" rather than the time of last write. `None` when the window is
    /// empty after trimming. A single sample has stddev exactly 0.0.
    pub fn stats(&mut self, item_id: &str) -> Option<PriceStats> {
        let now = (self.now_fn)();
        let series = self.series.get_mut(item_id)?;
        trim(series, now, self.window_secs, self.max_points);
        if series.is_empty() {
            return None;
        }

        let count = series.len();
        let sum: f64 = series.iter().map(|(_, p)| p).sum();
        let average = sum / count as f64;
        let stddev = if count == 1 {
            0.0
        } else {
            let variance: f64 = series
                .iter()
                .map(|(_, p)| (p - average).powi(2))
                .sum::<f64>()
                / count as f64;
            variance.sqrt()
        };

        Some(PriceStats {
            average,
            stddev,
            count,
        })
    }

    /// Drop all per-item state. Test isolation only.
    pub fn clear(&mut self) {
        self.series.clear();
    }
}

fn trim(series: &mut VecDeque<(f64, f64)>, now: f64, window_secs: f64, max_points: usize) {
    let cutoff = now - window_secs;
    while series.front().is_some_and(|(ts, _)| *ts < cutoff) {
        series.pop_front();
    }
    while series.len() > max_points {
        series.pop_front();
    }
}

fn now_epoch() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// History with a controllable clock (epoch seconds).
    fn fixed_clock_history(
        window_minutes: u64,
        max_points: usize,
        start: u64,
    ) -> (PriceHistory, Arc<AtomicU64>) {
        let clock = Arc::new(AtomicU64::new(start));
        let handle = clock.clone();
        let history = PriceHistory::with_now_fn(
            window_minutes,
            max_points,
            Box::new(move || handle.load(Ordering::SeqCst) as f64),
        );
        (history, clock)
    }

    #[test]
    fn test_stats_average_and_population_stddev() {
        let (mut history, _clock) = fixed_clock_history(60, 100, 10_000);

        history.add("item", 10.0, Some(9_990.0));
        history.add("item", 20.0, Some(9_995.0));
        history.add("item", 30.0, Some(10_000.0));

        let stats = history.stats("item").unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.average - 20.0).abs() < 1e-9);
        // Population stddev: sqrt(((10-20)^2 + 0 + (30-20)^2) / 3)
        assert!((stats.stddev - (200.0_f64 / 3.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_single_sample_stddev_is_zero() {
        let (mut history, _clock) = fixed_clock_history(60, 100, 10_000);
        history.add("item", 42.0, Some(10_000.0));

        let stats = history.stats("item").unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.stddev, 0.0);
    }

    #[test]
    fn test_count_cap_evicts_oldest_first() {
        let (mut history, _clock) = fixed_clock_history(60, 10, 10_000);

        for i in 0..25 {
            history.add("item", i as f64, Some(10_000.0 + i as f64));
        }

        let stats = history.stats("item").unwrap();
        assert_eq!(stats.count, 10);
        // Oldest evicted: remaining samples are prices 15..=24
        assert!((stats.average - 19.5).abs() < 1e-9);
    }

    #[test]
    fn test_age_trim_reapplied_at_read_time() {
        // Test: samples within the window at write time expire by read time
        let (mut history, clock) = fixed_clock_history(1, 100, 10_000);

        history.add("item", 5.0, Some(10_000.0));
        history.add("item", 7.0, Some(10_030.0));
        assert_eq!(history.stats("item").unwrap().count, 2);

        // Advance past the 60s horizon for the first sample only
        clock.store(10_061, Ordering::SeqCst);
        let stats = history.stats("item").unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.average, 7.0);

        // Everything expired
        clock.store(10_200, Ordering::SeqCst);
        assert!(history.stats("item").is_none());
    }

    #[test]
    fn test_stats_idempotent_without_writes() {
        let (mut history, _clock) = fixed_clock_history(60, 100, 10_000);
        history.add("item", 100.0, Some(9_990.0));
        history.add("item", 110.0, Some(10_000.0));

        let first = history.stats("item").unwrap();
        let second = history.stats("item").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_item_and_clear() {
        let (mut history, _clock) = fixed_clock_history(60, 100, 10_000);
        assert!(history.stats("nobody").is_none());

        history.add("item", 1.0, Some(10_000.0));
        assert!(history.stats("item").is_some());
        history.clear();
        assert!(history.stats("item").is_none());
    }

    #[test]
    fn test_observed_at_defaults_to_now() {
        let (mut history, clock) = fixed_clock_history(1, 100, 10_000);
        history.add("item", 3.0, None);

        // Still inside the window
        clock.store(10_059, Ordering::SeqCst);
        assert_eq!(history.stats("item").unwrap().count, 1);

        // Stamped at 10_000, so expired once the horizon passes
        clock.store(10_061, Ordering::SeqCst);
        assert!(history.stats("item").is_none());
    }
}
