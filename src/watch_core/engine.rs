//! Watch engine - per-cycle orchestration of the detection pipeline
//!
//! One batch of snapshots flows through:
//!
//! ```text
//! ItemSnapshot
//!     ↓
//! PriceHistory::add()          (write sample)
//!     ↓
//! reference_for()              (snapshot fields, else rolling stats)
//!     ↓
//! detect_underpriced / detect_fake_bin / detect_spike
//!     ↓
//! AlertState::can_alert()      (cooldown gate)
//!     ↓
//! Vec<Alert>                   (handed to the notifier by the caller)
//! ```
//!
//! The engine owns the only mutable state in the process (history and
//! cooldown maps) and is driven by a single task; no locking.

use super::cooldown::AlertState;
use super::detectors::{
    detect_fake_bin, detect_spike, detect_underpriced, Detection, FakeBinConfig, SpikeConfig,
    UnderpricedConfig,
};
use super::history::PriceHistory;
use super::types::ItemSnapshot;
use crate::config::Config;

/// One detection that survived the cooldown gate, paired with the snapshot
/// that produced it.
#[derive(Debug, Clone)]
pub struct Alert {
    pub snapshot: ItemSnapshot,
    pub detection: Detection,
}

pub struct WatchEngine {
    history: PriceHistory,
    alerts: AlertState,
    underpriced: UnderpricedConfig,
    fake_bin: FakeBinConfig,
    spike: SpikeConfig,
    cooldown_secs: f64,
    min_points: usize,
}

impl WatchEngine {
    pub fn new(config: &Config) -> Self {
        Self::with_stores(
            config,
            PriceHistory::new(config.history_window_minutes, config.history_max_points),
            AlertState::new(),
        )
    }

    /// Construct with caller-supplied stores; tests inject deterministic
    /// clocks through [`PriceHistory::with_now_fn`] and
    /// [`AlertState::with_now_fn`].
    pub fn with_stores(config: &Config, history: PriceHistory, alerts: AlertState) -> Self {
        Self {
            history,
            alerts,
            underpriced: UnderpricedConfig {
                min_discount: config.min_discount,
                zscore_min: config.zscore_min,
            },
            fake_bin: FakeBinConfig {
                fake_drop_pct: config.fake_drop_pct,
            },
            spike: SpikeConfig {
                spike_pct: config.spike_pct,
            },
            cooldown_secs: config.cooldown_secs(),
            min_points: config.history_min_points,
        }
    }

    /// Run one poll cycle's snapshots through the full pipeline.
    ///
    /// Every snapshot is written to history first, then all three detectors
    /// run against it (no early exit, no mutual exclusion). Detections that
    /// clear the cooldown gate come back as [`Alert`]s in input order.
    pub fn process_batch(&mut self, snapshots: Vec<ItemSnapshot>) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for snapshot in snapshots {
            let observed_at = snapshot.updated_at.map(|dt| dt.timestamp() as f64);
            self.history
                .add(&snapshot.item_id, snapshot.price, observed_at);

            let (avg, std) = self.reference_for(&snapshot);

            let detections = [
                detect_underpriced(snapshot.price, avg, std, &self.underpriced),
                detect_fake_bin(snapshot.price, avg, std, &self.fake_bin),
                detect_spike(snapshot.price, avg, std, &self.spike),
            ];

            for detection in detections.into_iter().flatten() {
                if self
                    .alerts
                    .can_alert(&snapshot.item_id, detection.kind(), self.cooldown_secs)
                {
                    alerts.push(Alert {
                        snapshot: snapshot.clone(),
                        detection,
                    });
                } else {
                    log::debug!(
                        "cooldown active for {} / {}",
                        snapshot.item_id,
                        detection.kind()
                    );
                }
            }
        }

        alerts
    }

    /// Reference average/stddev for a snapshot.
    ///
    /// The snapshot's own 24h fields win when present; a zero upstream
    /// average is treated as missing, not as an observed value. Rolling
    /// stats substitute only once the item has accumulated at least
    /// `min_points` samples.
    fn reference_for(&mut self, snapshot: &ItemSnapshot) -> (Option<f64>, Option<f64>) {
        let upstream_avg = snapshot.avg_price_24h.filter(|v| *v > 0.0);
        if upstream_avg.is_some() {
            return (upstream_avg, snapshot.std_24h);
        }

        match self.history.stats(&snapshot.item_id) {
            Some(stats) if stats.count >= self.min_points => {
                (Some(stats.average), Some(stats.stddev))
            }
            _ => (None, None),
        }
    }

    /// Drop all history and cooldown state. Test isolation only.
    pub fn clear(&mut self) {
        self.history.clear();
        self.alerts = AlertState::new();
    }
}
