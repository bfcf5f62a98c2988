//! Shared fixtures for the price-flow integration tests: an in-memory
//! SQLite pool with migrations applied, a scripted `PageFetcher`, and a
//! fetch policy with the delays zeroed out.

#![allow(dead_code)]

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use cardpricer_backend::external::page_fetcher::{
    DocumentQuery, FetchError, PageFetcher, SharedSession,
};
use cardpricer_backend::services::extraction_service::{AVG_30_PRICE_LABEL, TREND_PRICE_LABEL};
use cardpricer_backend::services::price_service::FetchPolicy;

pub async fn setup_pool() -> SqlitePool {
    // One connection, or every pooled connection would get its own
    // private :memory: database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    pool
}

pub fn test_policy() -> FetchPolicy {
    FetchPolicy {
        freshness_window: ChronoDuration::hours(24),
        settle_delay: tokio::time::Duration::from_secs(0),
        field_timeout: tokio::time::Duration::from_secs(1),
    }
}

/// One scripted navigation result: either a page exposing the given
/// label/value pairs, or a broken fetch.
pub enum ScriptedPage {
    Page(HashMap<String, String>),
    Broken(String),
}

/// Build a page carrying the two price labels, each optional.
pub fn price_page(trend: Option<&str>, avg_30: Option<&str>) -> ScriptedPage {
    let mut values = HashMap::new();
    if let Some(trend) = trend {
        values.insert(TREND_PRICE_LABEL.to_string(), trend.to_string());
    }
    if let Some(avg_30) = avg_30 {
        values.insert(AVG_30_PRICE_LABEL.to_string(), avg_30.to_string());
    }
    ScriptedPage::Page(values)
}

pub fn broken_page(reason: &str) -> ScriptedPage {
    ScriptedPage::Broken(reason.to_string())
}

/// A `PageFetcher` that replays scripted pages in order and counts how
/// often it was asked to navigate.
pub struct ScriptedFetcher {
    pages: VecDeque<ScriptedPage>,
    navigations: Arc<AtomicUsize>,
}

impl ScriptedFetcher {
    pub fn session(pages: Vec<ScriptedPage>) -> (SharedSession, Arc<AtomicUsize>) {
        let navigations = Arc::new(AtomicUsize::new(0));
        let fetcher = ScriptedFetcher {
            pages: pages.into(),
            navigations: navigations.clone(),
        };
        (SharedSession::new(Box::new(fetcher)), navigations)
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn navigate(&mut self, _url: &str) -> Result<Box<dyn DocumentQuery>, FetchError> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        match self.pages.pop_front() {
            Some(ScriptedPage::Page(values)) => Ok(Box::new(MapDocument { values })),
            Some(ScriptedPage::Broken(reason)) => Err(FetchError::Network(reason)),
            None => Err(FetchError::Network("script exhausted".to_string())),
        }
    }

    async fn shutdown(&mut self) {}
}

struct MapDocument {
    values: HashMap<String, String>,
}

#[async_trait]
impl DocumentQuery for MapDocument {
    async fn value_after_label(&self, label: &str) -> Result<Option<String>, FetchError> {
        Ok(self.values.get(label).cloned())
    }
}

/// Age a stored record so the next lookup sees it as stale.
pub async fn backdate_record(pool: &SqlitePool, url: &str, hours: i64) {
    let stale = Utc::now() - ChronoDuration::hours(hours);
    sqlx::query("UPDATE price_records SET last_updated = ?1 WHERE url = ?2")
        .bind(stale)
        .bind(url)
        .execute(pool)
        .await
        .unwrap();
}
