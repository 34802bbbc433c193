//! Watch Core - anomaly-detection pipeline
//!
//! The part of the process with real design content. Everything else
//! (sources, notifier, config) is I/O plumbing around this module.
//!
//! # Architecture
//!
//! ```text
//! Source (CSV export / listing page)
//!     ↓
//! normalizer (locale decimals, k/m/b magnitudes)
//!     ↓
//! PriceHistory (per-item rolling window, stats on demand)
//!     ↓
//! detectors (UNDERPRICED, FAKE_BIN_SUSPECT, SPIKE)
//!     ↓
//! AlertState (per item+detector cooldown)
//!     ↓
//! WebhookNotifier
//! ```
//!
//! All state is in-memory and process-lifetime only; nothing is persisted
//! across restarts.

pub mod cooldown;
pub mod detectors;
pub mod engine;
pub mod history;
pub mod normalizer;
pub mod types;

pub use cooldown::AlertState;
pub use detectors::{Detection, DetectorKind};
pub use engine::{Alert, WatchEngine};
pub use history::{PriceHistory, PriceStats};
pub use types::ItemSnapshot;
