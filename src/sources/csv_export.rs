//! CSV export reader for Futbin-style price dumps
//!
//! Re-reads the export on every poll but only when the file's mtime moved,
//! so an unchanged file costs one `stat`. Header validation is strict; row
//! validation is lenient (a bad row is skipped, never fatal).

use super::SnapshotSource;
use crate::watch_core::normalizer::normalize_decimal;
use crate::watch_core::types::ItemSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const REQUIRED_HEADERS: [&str; 9] = [
    "player_id",
    "name",
    "rating",
    "league",
    "position",
    "price",
    "avg_price_24h",
    "std_24h",
    "updated_at",
];

/// Raw row as exported; every field arrives as text and goes through the
/// normalizer before it becomes part of a snapshot.
#[derive(Debug, Deserialize)]
struct RawRow {
    player_id: Option<String>,
    name: Option<String>,
    rating: Option<String>,
    price: Option<String>,
    avg_price_24h: Option<String>,
    std_24h: Option<String>,
    updated_at: Option<String>,
}

impl RawRow {
    fn into_snapshot(self) -> Option<ItemSnapshot> {
        let name = self.name.filter(|s| !s.trim().is_empty())?;
        let price = self
            .price
            .as_deref()
            .and_then(normalize_decimal)
            .filter(|p| *p > 0.0)?;

        let item_id = self
            .player_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| ItemSnapshot::derive_id(&name));

        Some(ItemSnapshot {
            item_id,
            name,
            rating: self
                .rating
                .as_deref()
                .and_then(normalize_decimal)
                .map(|r| r as u32),
            price,
            avg_price_24h: self.avg_price_24h.as_deref().and_then(normalize_decimal),
            std_24h: self.std_24h.as_deref().and_then(normalize_decimal),
            updated_at: self.updated_at.as_deref().and_then(parse_timestamp),
        })
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

pub struct CsvExportSource {
    path: PathBuf,
    last_mtime: Option<SystemTime>,
}

impl CsvExportSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_mtime: None,
        }
    }

    fn read_rows(path: &Path) -> Option<Vec<ItemSnapshot>> {
        let mut reader = match csv::Reader::from_path(path) {
            Ok(reader) => reader,
            Err(e) => {
                log::warn!("⚠️  Cannot open export {}: {}", path.display(), e);
                return None;
            }
        };

        let headers = match reader.headers() {
            Ok(headers) => headers.clone(),
            Err(e) => {
                log::warn!("⚠️  Cannot read export headers: {}", e);
                return None;
            }
        };
        let missing: Vec<&str> = REQUIRED_HEADERS
            .iter()
            .filter(|h| !headers.iter().any(|col| col == **h))
            .copied()
            .collect();
        if !missing.is_empty() {
            log::warn!("⚠️  Incomplete export, missing headers: {}", missing.join(", "));
            return None;
        }

        let mut snapshots = Vec::new();
        for (line, record) in reader.deserialize::<RawRow>().enumerate() {
            match record {
                Ok(raw) => match raw.into_snapshot() {
                    Some(snapshot) => snapshots.push(snapshot),
                    None => log::debug!("skipping row {}: missing id/name/price", line + 2),
                },
                Err(e) => log::debug!("skipping row {}: {}", line + 2, e),
            }
        }
        Some(snapshots)
    }
}

#[async_trait]
impl SnapshotSource for CsvExportSource {
    async fn poll(&mut self) -> Vec<ItemSnapshot> {
        if !self.path.exists() {
            log::warn!("⚠️  Export file not found: {}", self.path.display());
            return Vec::new();
        }

        // Skip the cycle when the export has not been rewritten since the
        // last read.
        if let Ok(mtime) = fs::metadata(&self.path).and_then(|m| m.modified()) {
            if self.last_mtime.is_some_and(|prev| mtime <= prev) {
                log::debug!("export unchanged, skipping cycle");
                return Vec::new();
            }
            self.last_mtime = Some(mtime);
        }

        Self::read_rows(&self.path).unwrap_or_default()
    }
}
