use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("timed out: {0}")]
    Timeout(String),
}

/// Read access to a retrieved page. The one capability the extraction layer
/// needs: find the displayed value that follows a matching label.
#[async_trait]
pub trait DocumentQuery: Send + Sync {
    async fn value_after_label(&self, label: &str) -> Result<Option<String>, FetchError>;
}

/// Turns a URL into a queryable document. Takes `&mut self`: one session is
/// one browsing context and cannot load two pages at a time.
#[async_trait]
pub trait PageFetcher: Send {
    async fn navigate(&mut self, url: &str) -> Result<Box<dyn DocumentQuery>, FetchError>;

    /// Release whatever the session holds (connections, a browser, ...).
    /// Called once on graceful shutdown.
    async fn shutdown(&mut self);
}

/// The process-wide fetching session. Lookups that miss the cache lock it
/// for their whole navigate/settle/extract sequence; cache hits never touch
/// it. Owned by `AppState` and passed down explicitly.
pub struct SharedSession {
    fetcher: Mutex<Box<dyn PageFetcher>>,
}

impl SharedSession {
    pub fn new(fetcher: Box<dyn PageFetcher>) -> Self {
        Self {
            fetcher: Mutex::new(fetcher),
        }
    }

    /// Exclusive access for the duration of one fetch. The guard releases on
    /// every exit path, including failed navigations.
    pub async fn acquire(&self) -> MutexGuard<'_, Box<dyn PageFetcher>> {
        self.fetcher.lock().await
    }

    pub async fn shutdown(&self) {
        info!("Closing page-fetching session");
        self.fetcher.lock().await.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct CountingFetcher {
        navigations: Arc<AtomicUsize>,
        shut_down: Arc<AtomicBool>,
    }

    #[async_trait]
    impl PageFetcher for CountingFetcher {
        async fn navigate(&mut self, _url: &str) -> Result<Box<dyn DocumentQuery>, FetchError> {
            self.navigations.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Network("no backend in tests".to_string()))
        }

        async fn shutdown(&mut self) {
            self.shut_down.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn session_survives_failed_navigation_and_shuts_down() {
        let navigations = Arc::new(AtomicUsize::new(0));
        let shut_down = Arc::new(AtomicBool::new(false));
        let session = SharedSession::new(Box::new(CountingFetcher {
            navigations: navigations.clone(),
            shut_down: shut_down.clone(),
        }));

        {
            let mut fetcher = session.acquire().await;
            assert!(fetcher.navigate("https://www.cardmarket.com/x").await.is_err());
        }

        // The guard released despite the error; the session is still usable.
        {
            let mut fetcher = session.acquire().await;
            let _ = fetcher.navigate("https://www.cardmarket.com/y").await;
        }

        session.shutdown().await;

        assert_eq!(navigations.load(Ordering::SeqCst), 2);
        assert!(shut_down.load(Ordering::SeqCst));
    }
}
