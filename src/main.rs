use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::net::TcpListener;

use cardpricer_backend::app;
use cardpricer_backend::config::AppConfig;
use cardpricer_backend::external::cardmarket::HttpPageFetcher;
use cardpricer_backend::external::page_fetcher::{PageFetcher, SharedSession};
use cardpricer_backend::logging::{self, LoggingConfig};
use cardpricer_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    logging::init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let config = AppConfig::from_env();

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.database_url))?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let fetcher: Box<dyn PageFetcher> = match config.page_fetcher.to_lowercase().as_str() {
        "http" => {
            tracing::info!("📊 Using page fetcher: HTTP client");
            Box::new(HttpPageFetcher::new())
        }
        other => anyhow::bail!("Invalid PAGE_FETCHER: {other}. Must be 'http'"),
    };
    let session = Arc::new(SharedSession::new(fetcher));

    let state = AppState {
        pool,
        session: session.clone(),
        config: Arc::new(config.clone()),
    };
    let app = app::create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("🚀 Card price backend running at http://{}/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(session))
        .await?;

    Ok(())
}

/// Wait for ctrl-c, then tear down the shared fetching session before the
/// server stops accepting. An abrupt kill skips this and may leak it.
async fn shutdown_signal(session: Arc<SharedSession>) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    tracing::info!("Shutdown signal received");
    session.shutdown().await;
}
