//! Market watch - pricing-anomaly alerts for a virtual-item marketplace
//!
//! Ingests periodic price snapshots (CSV export or scraped listing page),
//! maintains per-item rolling price history, runs threshold-based anomaly
//! detectors, and raises cooldown-deduplicated alerts to a webhook.

pub mod config;
pub mod notifier;
pub mod sources;
pub mod watch_core;

pub use config::{Config, ConfigError, SourceKind};
pub use watch_core::{Alert, Detection, DetectorKind, ItemSnapshot, WatchEngine};
