use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};
use url::Url;

use crate::errors::AppError;
use crate::models::{PriceQuote, PriceTotals};
use crate::services::price_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(lookup_price))
        .route("/total", get(get_total_prices))
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub url: String,
}

pub async fn lookup_price(
    State(state): State<AppState>,
    Query(params): Query<LookupQuery>,
) -> Result<Json<PriceQuote>, AppError> {
    info!("GET /api/prices - Looking up {}", params.url);

    // Foreign hosts are rejected here, before the store or the fetching
    // session is involved.
    validate_source_url(&params.url, &state.config.source_host)?;

    let policy = state.config.fetch_policy();
    let quote = price_service::fetch_price(&state.pool, &state.session, &policy, &params.url)
        .await
        .map_err(|e| {
            error!("Failed to look up price for {}: {}", params.url, e);
            e
        })?;

    Ok(Json(quote))
}

pub async fn get_total_prices(
    State(state): State<AppState>,
) -> Result<Json<PriceTotals>, AppError> {
    info!("GET /api/prices/total - Summing stored prices");

    let totals = price_service::total_prices(&state.pool).await.map_err(|e| {
        error!("Failed to sum stored prices: {}", e);
        e
    })?;

    Ok(Json(totals))
}

/// A lookup URL must point at the configured source site (the host itself
/// or a subdomain of it).
fn validate_source_url(raw: &str, source_host: &str) -> Result<(), AppError> {
    let parsed =
        Url::parse(raw).map_err(|_| AppError::Validation(format!("Invalid URL: {raw}")))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::Validation(format!("Invalid URL: {raw}")))?;

    if host == source_host || host.ends_with(&format!(".{source_host}")) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Invalid URL. Must be from {source_host}."
        )))
    }
}
