//! Alert deduplication per (item, detector) pair
//!
//! In-memory, process-lifetime only. Keys are never evicted; the key space
//! is bounded by catalog size.

use super::detectors::DetectorKind;
use std::collections::HashMap;

/// Tracks the last permitted alert time per (item, detector) key.
pub struct AlertState {
    last_alerts: HashMap<(String, DetectorKind), f64>,
    now_fn: Box<dyn Fn() -> f64 + Send + Sync>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::with_now_fn(Box::new(|| {
            chrono::Utc::now().timestamp_millis() as f64 / 1000.0
        }))
    }

    /// Deterministic clock injection for tests.
    pub fn with_now_fn(now_fn: Box<dyn Fn() -> f64 + Send + Sync>) -> Self {
        Self {
            last_alerts: HashMap::new(),
            now_fn,
        }
    }

    /// Atomic check-and-update: true when no prior firing is recorded for the
    /// key or the cooldown has elapsed since the last *permitted* alert, in
    /// which case now becomes the new last-firing time. Denied checks leave
    /// the recorded time untouched, so repeated suppressed checks never
    /// extend the window.
    pub fn can_alert(&mut self, item_id: &str, kind: DetectorKind, cooldown_secs: f64) -> bool {
        let now = (self.now_fn)();
        let key = (item_id.to_string(), kind);
        if let Some(&last) = self.last_alerts.get(&key) {
            if now - last < cooldown_secs {
                return false;
            }
        }
        self.last_alerts.insert(key, now);
        true
    }
}

impl Default for AlertState {
    fn default() -> Self {
        Self::new()
    }
}
