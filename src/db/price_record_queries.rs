use sqlx::SqlitePool;
use tracing::error;

use crate::models::PriceRecord;

pub async fn fetch_by_url(
    pool: &SqlitePool,
    url: &str,
) -> Result<Option<PriceRecord>, sqlx::Error> {
    sqlx::query_as::<_, PriceRecord>(
        "SELECT url, trend_price, avg_30_price, last_updated
         FROM price_records
         WHERE url = ?1",
    )
    .bind(url)
    .fetch_optional(pool)
    .await
}

/// Full-row replacement keyed on URL. A second fetch for the same URL never
/// produces a second row.
pub async fn upsert(pool: &SqlitePool, record: &PriceRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO price_records (url, trend_price, avg_30_price, last_updated)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(url) DO UPDATE SET
             trend_price = excluded.trend_price,
             avg_30_price = excluded.avg_30_price,
             last_updated = excluded.last_updated",
    )
    .bind(&record.url)
    .bind(record.trend_price)
    .bind(record.avg_30_price)
    .bind(record.last_updated)
    .execute(pool)
    .await
    .map_err(|e| {
        error!("Failed to upsert price record for {}: {}", record.url, e);
        e
    })?;

    Ok(())
}

/// Sum both price columns across the whole table. NULL fields count as
/// zero, and an empty table sums to (0, 0).
pub async fn sum_all(pool: &SqlitePool) -> Result<(f64, f64), sqlx::Error> {
    sqlx::query_as::<_, (f64, f64)>(
        "SELECT COALESCE(SUM(trend_price), 0.0), COALESCE(SUM(avg_30_price), 0.0)
         FROM price_records",
    )
    .fetch_one(pool)
    .await
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM price_records")
        .fetch_one(pool)
        .await
}
