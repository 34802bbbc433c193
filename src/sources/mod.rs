//! Snapshot acquisition collaborators
//!
//! The core only requires a batch of [`ItemSnapshot`]s per poll, each with
//! at least an identifier and a positive price. Sources never fail outward:
//! a malformed record is skipped, total acquisition failure yields an empty
//! batch (logged as a warning) and the cycle retries at the next interval.

use crate::watch_core::types::ItemSnapshot;
use async_trait::async_trait;

pub mod csv_export;
pub mod listing_page;

pub use csv_export::CsvExportSource;
pub use listing_page::ListingPageSource;

#[async_trait]
pub trait SnapshotSource: Send {
    /// One acquisition attempt, yielding this cycle's snapshots.
    async fn poll(&mut self) -> Vec<ItemSnapshot>;
}
