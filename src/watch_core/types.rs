//! Core record types shared across the watch pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed market listing for an item, produced fresh each poll cycle.
///
/// `item_id` and `price` are required; the 24h average/stddev are supplied by
/// some acquisition paths and backfilled from rolling history otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub item_id: String,
    pub name: String,
    pub rating: Option<u32>,
    pub price: f64,
    pub avg_price_24h: Option<f64>,
    pub std_24h: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ItemSnapshot {
    /// Deterministic identifier for listings that carry no native id.
    pub fn derive_id(name: &str) -> String {
        name.trim().to_lowercase().replace(' ', "-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_id_is_deterministic() {
        assert_eq!(ItemSnapshot::derive_id("Kylian Mbappé"), "kylian-mbappé");
        assert_eq!(ItemSnapshot::derive_id("  Rodri  "), "rodri");
        assert_eq!(
            ItemSnapshot::derive_id("Virgil van Dijk"),
            ItemSnapshot::derive_id("Virgil van Dijk")
        );
    }
}
