use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Last-known prices for a listing URL. One row per URL, replaced wholesale
// on every fetch attempt; `last_updated` moves even when the attempt
// produced no values.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PriceRecord {
    pub url: String,
    pub trend_price: Option<f64>,
    pub avg_30_price: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

/// What a lookup returns to the caller: the two price fields plus whether
/// they came out of the store or from a fresh fetch.
#[derive(Debug, Clone, Serialize)]
pub struct PriceQuote {
    pub url: String,
    pub trend_price: Option<f64>,
    pub avg_30_price: Option<f64>,
    pub cached: bool,
}

impl PriceQuote {
    pub fn from_record(record: PriceRecord, cached: bool) -> Self {
        Self {
            url: record.url,
            trend_price: record.trend_price,
            avg_30_price: record.avg_30_price,
            cached,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceTotals {
    pub total_trend_price: f64,
    pub total_avg_30_price: f64,
}
