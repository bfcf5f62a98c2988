use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::external::page_fetcher::SharedSession;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub session: Arc<SharedSession>,
    pub config: Arc<AppConfig>,
}
