use std::path::PathBuf;

use chrono::Duration as ChronoDuration;
use tokio::time::Duration;

use crate::services::price_service::FetchPolicy;

/// Runtime configuration, read once at startup. Every knob has a default so
/// the service comes up with nothing but a writable working directory.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    /// Host (or parent domain) a lookup URL must belong to.
    pub source_host: String,
    /// Cached records younger than this are served without a fetch.
    pub cache_window_hours: i64,
    /// Pause after navigation so interstitial bot checks can clear.
    pub settle_delay_secs: u64,
    /// Upper bound on locating a single labeled field in a page.
    pub field_timeout_secs: u64,
    /// Where uploaded and generated CSV files are kept.
    pub storage_dir: PathBuf,
    pub page_fetcher: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://prices.db?mode=rwc".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            source_host: std::env::var("SOURCE_HOST")
                .unwrap_or_else(|_| "cardmarket.com".to_string()),
            cache_window_hours: std::env::var("PRICE_CACHE_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
            settle_delay_secs: std::env::var("PAGE_SETTLE_SECS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            field_timeout_secs: std::env::var("FIELD_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            storage_dir: PathBuf::from(
                std::env::var("STORAGE_DIR").unwrap_or_else(|_| ".".to_string()),
            ),
            page_fetcher: std::env::var("PAGE_FETCHER").unwrap_or_else(|_| "http".to_string()),
        }
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            freshness_window: ChronoDuration::hours(self.cache_window_hours),
            settle_delay: Duration::from_secs(self.settle_delay_secs),
            field_timeout: Duration::from_secs(self.field_timeout_secs),
        }
    }
}
