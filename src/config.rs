//! Process configuration from environment variables
//!
//! Every knob has a default mirroring the reference deployment; a variable
//! that is present but unparsable is fatal at startup. Nothing else in the
//! process reads the environment directly.

use std::env;
use std::fmt;
use std::str::FromStr;

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Poll a CSV export file on disk.
    Csv,
    /// Scrape a paginated listing page over HTTP.
    Listing,
}

/// Acquisition knobs for the listing-page scraper.
#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub base_url: String,
    pub platform: String,
    pub pages: u32,
    pub page_delay_ms: u64,
    pub page_jitter_ms: u64,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceKind,
    pub data_path: String,
    pub poll_interval_secs: u64,

    pub min_discount: f64,
    pub zscore_min: f64,
    pub fake_drop_pct: f64,
    pub spike_pct: f64,
    pub cooldown_minutes: u64,

    pub history_window_minutes: u64,
    pub history_max_points: usize,
    pub history_min_points: usize,

    pub notify_webhook: bool,
    pub webhook_url: Option<String>,

    pub listing: ListingConfig,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(format!("{} cannot be parsed from '{}'", key, raw))
        }),
        Err(_) => Ok(default),
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables (defaults in parentheses):
    /// - `SOURCE` (`csv`): `csv` or `listing`
    /// - `DATA_PATH` (`./data/futbin_export.csv`)
    /// - `POLL_INTERVAL_SECS` (20)
    /// - `MIN_DISCOUNT` (0.12), `ZSCORE_MIN` (1.8)
    /// - `FAKE_DROP_PCT` (0.40), `SPIKE_PCT` (0.20)
    /// - `COOLDOWN_MINUTES` (15)
    /// - `HISTORY_WINDOW_MINUTES` (1440), `HISTORY_MAX_POINTS` (400),
    ///   `HISTORY_MIN_POINTS` (5)
    /// - `NOTIFY_WEBHOOK` (true), `WEBHOOK_URL` (unset)
    /// - `LISTING_URL`, `LISTING_PLATFORM` (`ps`), `LISTING_PAGES` (1),
    ///   `PAGE_DELAY_MS` (1000), `PAGE_JITTER_MS` (0),
    ///   `HTTP_TIMEOUT_SECS` (15), `HTTP_MAX_RETRIES` (3),
    ///   `HTTP_BACKOFF_BASE_MS` (500)
    pub fn from_env() -> Result<Self, ConfigError> {
        let source = match env_string("SOURCE", "csv").to_lowercase().as_str() {
            "csv" => SourceKind::Csv,
            "listing" => SourceKind::Listing,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "SOURCE must be 'csv' or 'listing', got '{}'",
                    other
                )))
            }
        };

        let config = Self {
            source,
            data_path: env_string("DATA_PATH", "./data/futbin_export.csv"),
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", 20)?,

            min_discount: env_parse("MIN_DISCOUNT", 0.12)?,
            zscore_min: env_parse("ZSCORE_MIN", 1.8)?,
            fake_drop_pct: env_parse("FAKE_DROP_PCT", 0.40)?,
            spike_pct: env_parse("SPIKE_PCT", 0.20)?,
            cooldown_minutes: env_parse("COOLDOWN_MINUTES", 15)?,

            history_window_minutes: env_parse("HISTORY_WINDOW_MINUTES", 24 * 60)?,
            history_max_points: env_parse("HISTORY_MAX_POINTS", 400)?,
            history_min_points: env_parse("HISTORY_MIN_POINTS", 5)?,

            notify_webhook: env_parse("NOTIFY_WEBHOOK", true)?,
            webhook_url: env::var("WEBHOOK_URL").ok().filter(|s| !s.is_empty()),

            listing: ListingConfig {
                base_url: env_string("LISTING_URL", "https://www.futwiz.com/en/fc24/players"),
                platform: env_string("LISTING_PLATFORM", "ps"),
                pages: env_parse("LISTING_PAGES", 1)?,
                page_delay_ms: env_parse("PAGE_DELAY_MS", 1_000)?,
                page_jitter_ms: env_parse("PAGE_JITTER_MS", 0)?,
                timeout_secs: env_parse("HTTP_TIMEOUT_SECS", 15)?,
                max_retries: env_parse("HTTP_MAX_RETRIES", 3)?,
                backoff_base_ms: env_parse("HTTP_BACKOFF_BASE_MS", 500)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "POLL_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }
        if self.history_window_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "HISTORY_WINDOW_MINUTES must be at least 1".to_string(),
            ));
        }
        if self.history_max_points < 10 {
            return Err(ConfigError::InvalidValue(
                "HISTORY_MAX_POINTS must be at least 10".to_string(),
            ));
        }
        if self.history_min_points == 0 {
            return Err(ConfigError::InvalidValue(
                "HISTORY_MIN_POINTS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cooldown_secs(&self) -> f64 {
        (self.cooldown_minutes * 60) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests share process state; each test only touches variables
    // no other test reads and cleans up after itself.

    #[test]
    fn test_unparsable_value_is_fatal() {
        env::set_var("SPIKE_PCT", "one fifth");
        let result = Config::from_env();
        env::remove_var("SPIKE_PCT");

        assert!(result.is_err());
    }

    fn base_config() -> Config {
        Config {
            source: SourceKind::Csv,
            data_path: "./data/futbin_export.csv".to_string(),
            poll_interval_secs: 20,
            min_discount: 0.12,
            zscore_min: 1.8,
            fake_drop_pct: 0.40,
            spike_pct: 0.20,
            cooldown_minutes: 15,
            history_window_minutes: 24 * 60,
            history_max_points: 400,
            history_min_points: 5,
            notify_webhook: false,
            webhook_url: None,
            listing: ListingConfig {
                base_url: "https://example.test/players".to_string(),
                platform: "ps".to_string(),
                pages: 1,
                page_delay_ms: 0,
                page_jitter_ms: 0,
                timeout_secs: 15,
                max_retries: 3,
                backoff_base_ms: 500,
            },
        }
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut config = base_config();
        config.history_max_points = 3;
        assert!(config.validate().is_err());

        config.history_max_points = 10;
        config.history_min_points = 0;
        assert!(config.validate().is_err());

        config.history_min_points = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cooldown_in_seconds() {
        assert_eq!(base_config().cooldown_secs(), 900.0);
    }

    #[test]
    fn test_invalid_source_rejected() {
        env::set_var("SOURCE", "ftp");
        let result = Config::from_env();
        env::remove_var("SOURCE");

        assert!(result.is_err());
    }
}
