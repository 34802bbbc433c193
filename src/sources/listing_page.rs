//! Listing-page scraper for Futwiz-style player price tables
//!
//! Paginated GET with bounded retries and exponential backoff on transient
//! statuses, an inter-page delay with optional jitter, and a lenient row
//! parser that works off `data-*` attributes first and visible cell text as
//! a fallback. A page with no parsable rows ends pagination.

use super::SnapshotSource;
use crate::config::ListingConfig;
use crate::watch_core::normalizer::{normalize_decimal, parse_coin};
use crate::watch_core::types::ItemSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Duration as TimeDelta, NaiveDateTime, Utc};
use rand::Rng;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36";

/// Transient statuses worth retrying; anything else fails the page outright.
const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug)]
enum FetchError {
    Status(u16),
    Transport(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Status(code) => write!(f, "HTTP {}", code),
            FetchError::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

pub struct ListingPageSource {
    config: ListingConfig,
    client: reqwest::Client,
}

impl ListingPageSource {
    pub fn new(config: ListingConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// GET one page, retrying transient failures with exponential backoff.
    /// Retries are bounded by `max_retries`; exhaustion surfaces the last
    /// failure to the caller.
    async fn fetch_page(&self, page: u32) -> Result<String, FetchError> {
        let mut attempt = 0u32;
        loop {
            let result = self
                .client
                .get(&self.config.base_url)
                .query(&[
                    ("page", page.to_string()),
                    ("platform", self.config.platform.clone()),
                ])
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .timeout(Duration::from_secs(self.config.timeout_secs))
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        return response
                            .text()
                            .await
                            .map_err(|e| FetchError::Transport(e.to_string()));
                    }
                    if !RETRY_STATUSES.contains(&status) || attempt >= self.config.max_retries {
                        return Err(FetchError::Status(status));
                    }
                }
                Err(e) => {
                    if attempt >= self.config.max_retries {
                        return Err(FetchError::Transport(e.to_string()));
                    }
                }
            }

            let delay = self
                .config
                .backoff_base_ms
                .saturating_mul(2u64.saturating_pow(attempt));
            log::warn!(
                "⏳ Retrying page {} in {}ms (attempt {} of {})",
                page,
                delay,
                attempt + 1,
                self.config.max_retries
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
            attempt += 1;
        }
    }

    async fn page_pause(&self) {
        let base = self.config.page_delay_ms as i64;
        let jitter = if self.config.page_jitter_ms > 0 {
            let bound = self.config.page_jitter_ms as i64;
            rand::thread_rng().gen_range(-bound..=bound)
        } else {
            0
        };
        let delay = (base + jitter).max(0) as u64;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

#[async_trait]
impl SnapshotSource for ListingPageSource {
    async fn poll(&mut self) -> Vec<ItemSnapshot> {
        let mut all = Vec::new();
        let now = Utc::now();

        for page in 1..=self.config.pages.max(1) {
            let html = match self.fetch_page(page).await {
                Ok(html) => html,
                Err(e) => {
                    log::warn!("⚠️  Failed to fetch listing page {}: {}", page, e);
                    break;
                }
            };

            let rows = parse_table(&html, &self.config.platform, now);
            if rows.is_empty() {
                break;
            }
            all.extend(rows);

            if page < self.config.pages {
                self.page_pause().await;
            }
        }

        all
    }
}

fn parse_table(html: &str, platform: &str, now: DateTime<Utc>) -> Vec<ItemSnapshot> {
    let document = Html::parse_document(html);
    let Ok(table_sel) = Selector::parse("table") else {
        return Vec::new();
    };
    let Ok(tr_sel) = Selector::parse("tr") else {
        return Vec::new();
    };

    let Some(table) = document.select(&table_sel).next() else {
        return Vec::new();
    };

    table
        .select(&tr_sel)
        .filter_map(|tr| parse_row(tr, platform, now))
        .collect()
}

fn parse_row(tr: ElementRef, platform: &str, now: DateTime<Utc>) -> Option<ItemSnapshot> {
    let td_sel = Selector::parse("td").ok()?;
    let cells: Vec<ElementRef> = tr.select(&td_sel).collect();
    if cells.is_empty() {
        return None;
    }

    let native_id = tr
        .value()
        .attr("data-playerid")
        .or_else(|| tr.value().attr("data-id"));

    // Column map from data-title/data-th attributes, lowercased
    let mut colmap: HashMap<String, String> = HashMap::new();
    for td in &cells {
        let key = td
            .value()
            .attr("data-title")
            .or_else(|| td.value().attr("data-th"))
            .unwrap_or("")
            .trim()
            .to_lowercase();
        if !key.is_empty() {
            colmap.insert(key, cell_text(td));
        }
    }

    // Machine-readable price/average attributes take precedence over text
    let platform_price_attr = format!("data-price-{}", platform);
    let attr_price = cells.iter().find_map(|td| {
        td.value()
            .attr(&platform_price_attr)
            .or_else(|| td.value().attr("data-price"))
            .and_then(parse_coin)
    });
    let attr_avg = cells.iter().find_map(|td| {
        td.value()
            .attr("data-average")
            .or_else(|| td.value().attr("data-avg"))
            .and_then(parse_coin)
    });

    let texts: Vec<String> = cells.iter().map(cell_text).collect();

    let name = colmap
        .get("name")
        .or_else(|| colmap.get("player"))
        .cloned()
        .or_else(|| texts.get(1).cloned())
        .filter(|s| !s.is_empty())?;

    let rating = colmap
        .get("rating")
        .cloned()
        .or_else(|| texts.first().cloned())
        .as_deref()
        .and_then(normalize_decimal)
        .map(|r| r as u32);

    let price_keys = [
        format!("price ({})", platform),
        format!("bin ({})", platform),
        format!("{} lowest", platform),
        format!("{} price", platform),
        "price".to_string(),
    ];
    let price_text = price_keys
        .iter()
        .find_map(|k| colmap.get(k))
        .cloned()
        .or_else(|| texts.get(5).cloned());
    let price = attr_price
        .or_else(|| price_text.as_deref().and_then(parse_coin))
        .filter(|p| *p > 0.0)?;

    let avg_text = colmap
        .get("average")
        .or_else(|| colmap.get("24h avg"))
        .cloned()
        .or_else(|| texts.get(6).cloned());
    let avg = attr_avg.or_else(|| avg_text.as_deref().and_then(parse_coin));

    let item_id = native_id
        .map(str::to_string)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| ItemSnapshot::derive_id(&name));

    let updated = colmap
        .get("updated")
        .or_else(|| colmap.get("last updated"));

    Some(ItemSnapshot {
        item_id,
        name,
        rating,
        price,
        // The listing page carries no stddev; a missing average falls back
        // to the current price so detectors stay silent until history fills
        avg_price_24h: Some(avg.unwrap_or(price)),
        std_24h: None,
        updated_at: Some(parse_updated(updated.map(String::as_str), now)),
    })
}

fn cell_text(td: &ElementRef) -> String {
    td.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve the "updated" cell into an absolute time. Relative phrasings
/// ("5 minutes ago") resolve against `now`; unrecognized text falls back
/// to `now` rather than dropping the row.
fn parse_updated(text: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let text = match text {
        Some(t) => t.trim(),
        None => return now,
    };
    let lower = text.to_lowercase();
    if lower.is_empty() || lower == "just now" || lower == "now" || lower == "-" {
        return now;
    }

    if let Some(delta) = parse_relative(&lower) {
        return now - delta;
    }

    for fmt in ["%d/%m/%Y %H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return naive.and_utc();
        }
    }

    now
}

fn parse_relative(lower: &str) -> Option<TimeDelta> {
    let mut parts = lower.split_whitespace();
    let value: i64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?;
    if parts.next() != Some("ago") {
        return None;
    }

    match unit.trim_end_matches('s') {
        "second" => Some(TimeDelta::seconds(value)),
        "minute" => Some(TimeDelta::minutes(value)),
        "hour" => Some(TimeDelta::hours(value)),
        "day" => Some(TimeDelta::days(value)),
        "week" => Some(TimeDelta::weeks(value)),
        _ => None,
    }
}
