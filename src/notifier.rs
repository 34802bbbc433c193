//! Webhook alert delivery and message formatting
//!
//! Delivery is best-effort: a failed send is logged by the caller and the
//! loop moves on. Correctness lives in alert *generation*; this module only
//! ships text.

use crate::watch_core::detectors::Detection;
use crate::watch_core::types::ItemSnapshot;
use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum NotifyError {
    MissingWebhook,
    Http(u16, String),
    Transport(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::MissingWebhook => write!(f, "webhook URL not configured"),
            NotifyError::Http(status, body) => write!(f, "HTTP {}: {}", status, body),
            NotifyError::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

pub struct WebhookNotifier {
    url: Option<String>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }

    /// Post `content` to the configured webhook as a JSON `{content}` body.
    pub async fn send(&self, content: &str) -> Result<(), NotifyError> {
        let url = self.url.as_deref().ok_or(NotifyError::MissingWebhook)?;

        let response = self
            .client
            .post(url)
            .timeout(Duration::from_secs(10))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(NotifyError::Http(status, body));
        }

        Ok(())
    }
}

/// Coin amounts render with dot-grouped thousands, the convention of the
/// marketplace this watches.
pub fn fmt_coin(value: f64) -> String {
    let n = value.round() as i64;
    let digits = n.abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Human-readable alert text with a badge per detector kind.
pub fn format_alert(snapshot: &ItemSnapshot, detection: &Detection) -> String {
    let name = &snapshot.name;
    let rating = snapshot
        .rating
        .map(|r| r.to_string())
        .unwrap_or_else(|| "?".to_string());
    let price = fmt_coin(snapshot.price);
    let expected = fmt_coin(detection.expected());

    match detection {
        Detection::Underpriced {
            discount_pct,
            score,
            ..
        } => {
            let z = score
                .map(|z| format!("{:.2}", z))
                .unwrap_or_else(|| "n/a".to_string());
            format!(
                "🟢 **UNDERPRICED** — {} ({})\nPrice: **{}** | Expected: {} (discount ~{}%, z≈{})",
                name,
                rating,
                price,
                expected,
                (discount_pct * 100.0) as i64,
                z
            )
        }
        Detection::FakeBinSuspect { drop_pct, .. } => format!(
            "🟠 **FAKE BIN?** — {} ({})\nPrice: **{}** | Average: {} (drop ~{}%)",
            name,
            rating,
            price,
            expected,
            (drop_pct * 100.0) as i64
        ),
        Detection::Spike { spike_pct, .. } => format!(
            "🔵 **SPIKE** — {} ({})\nPrice: **{}** | Average: {} (up ~{}%)",
            name,
            rating,
            price,
            expected,
            (spike_pct * 100.0) as i64
        ),
    }
}
