use tokio::time::{timeout, Duration};
use tracing::warn;

use crate::external::page_fetcher::DocumentQuery;

/// Labels as rendered on a listing page's price table.
pub const TREND_PRICE_LABEL: &str = "Price Trend";
pub const AVG_30_PRICE_LABEL: &str = "30-days average price";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractedFields {
    pub trend_price: Option<f64>,
    pub avg_30_price: Option<f64>,
}

/// Pull both price fields out of a page. Each field is located and parsed
/// independently, each lookup bounded by `field_timeout`; whatever goes
/// wrong with one field (missing label, garbage text, lookup error,
/// timeout) turns into `None` for that field alone.
pub async fn extract_fields(
    doc: &dyn DocumentQuery,
    field_timeout: Duration,
) -> ExtractedFields {
    ExtractedFields {
        trend_price: lookup_price(doc, TREND_PRICE_LABEL, field_timeout).await,
        avg_30_price: lookup_price(doc, AVG_30_PRICE_LABEL, field_timeout).await,
    }
}

async fn lookup_price(
    doc: &dyn DocumentQuery,
    label: &str,
    field_timeout: Duration,
) -> Option<f64> {
    match timeout(field_timeout, doc.value_after_label(label)).await {
        Ok(Ok(Some(raw))) => parse_price(&raw),
        Ok(Ok(None)) => None,
        Ok(Err(e)) => {
            warn!("Lookup failed for '{}': {}", label, e);
            None
        }
        Err(_) => {
            warn!("Lookup timed out for '{}'", label);
            None
        }
    }
}

/// Parse a displayed price: trailing currency marker stripped, decimal
/// comma converted to a period. `"12,34 €"` parses to `12.34`; anything
/// unparseable is `None`, never an error.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = raw
        .trim()
        .trim_end_matches(|c: char| !c.is_ascii_digit())
        .trim();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.replace(',', ".").parse::<f64>().ok()
}
