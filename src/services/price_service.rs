use chrono::{Duration as ChronoDuration, Utc};
use sqlx::SqlitePool;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use crate::db;
use crate::errors::AppError;
use crate::external::page_fetcher::SharedSession;
use crate::models::{PriceQuote, PriceRecord, PriceTotals};
use crate::services::extraction_service::{self, ExtractedFields};

/// Knobs of the fetch-or-cache decision, derived from `AppConfig` in
/// production and constructed directly in tests.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Records younger than this are served from the store, no fetch.
    pub freshness_window: ChronoDuration,
    /// Pause between navigation and extraction while interstitials clear.
    pub settle_delay: Duration,
    /// Per-field bound on locating one labeled value.
    pub field_timeout: Duration,
}

/// What one trip through the fetcher produced.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Both fields extracted.
    Success(ExtractedFields),
    /// Page retrieved but at least one field was missing or unparseable.
    Partial(ExtractedFields),
    /// Navigation or retrieval broke; no fields at all.
    Failed(String),
}

impl FetchOutcome {
    fn fields(&self) -> ExtractedFields {
        match self {
            FetchOutcome::Success(fields) | FetchOutcome::Partial(fields) => *fields,
            FetchOutcome::Failed(_) => ExtractedFields {
                trend_price: None,
                avg_30_price: None,
            },
        }
    }
}

/// Serve the price fields for `url`, from the store when the record is
/// fresh enough, otherwise via one exclusive trip through the shared
/// session. Every fresh attempt is persisted, a broken one included, so a
/// failing source is not re-hit until the freshness window passes. Only
/// store errors surface to the caller.
pub async fn fetch_price(
    pool: &SqlitePool,
    session: &SharedSession,
    policy: &FetchPolicy,
    url: &str,
) -> Result<PriceQuote, AppError> {
    if let Some(record) = db::price_record_queries::fetch_by_url(pool, url).await? {
        if Utc::now() - record.last_updated < policy.freshness_window {
            info!("⚡ Serving cached price for {}", url);
            return Ok(PriceQuote::from_record(record, true));
        }
    }

    let outcome = fetch_fresh(session, policy, url).await;

    match &outcome {
        FetchOutcome::Success(_) => info!("✓ Fetched prices for {}", url),
        FetchOutcome::Partial(fields) => info!(
            "✓ Fetched prices for {} (trend: {:?}, 30-day avg: {:?})",
            url, fields.trend_price, fields.avg_30_price
        ),
        // The reason survives only in the log; storage records the attempt
        // the same way it records a page without prices.
        FetchOutcome::Failed(reason) => error!("✗ Fetch failed for {}: {}", url, reason),
    }

    let fields = outcome.fields();
    let record = PriceRecord {
        url: url.to_string(),
        trend_price: fields.trend_price,
        avg_30_price: fields.avg_30_price,
        last_updated: Utc::now(),
    };
    db::price_record_queries::upsert(pool, &record).await?;

    Ok(PriceQuote::from_record(record, false))
}

/// One navigate/settle/extract sequence under the session lock. The lock
/// covers the whole sequence: a second page load would clobber the
/// browsing context mid-extraction.
async fn fetch_fresh(session: &SharedSession, policy: &FetchPolicy, url: &str) -> FetchOutcome {
    let mut fetcher = session.acquire().await;

    let doc = match fetcher.navigate(url).await {
        Ok(doc) => doc,
        Err(e) => return FetchOutcome::Failed(e.to_string()),
    };

    sleep(policy.settle_delay).await;

    let fields = extraction_service::extract_fields(doc.as_ref(), policy.field_timeout).await;

    match (fields.trend_price, fields.avg_30_price) {
        (Some(_), Some(_)) => FetchOutcome::Success(fields),
        _ => FetchOutcome::Partial(fields),
    }
}

/// Sum of each price column over every stored record, rounded to cents
/// here at the presentation boundary; stored values stay unrounded.
pub async fn total_prices(pool: &SqlitePool) -> Result<PriceTotals, AppError> {
    let (total_trend, total_avg_30) = db::price_record_queries::sum_all(pool).await?;

    Ok(PriceTotals {
        total_trend_price: round_cents(total_trend),
        total_avg_30_price: round_cents(total_avg_30),
    })
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
