use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tokio::time::Duration;
use tracing::info;

use crate::external::page_fetcher::{DocumentQuery, FetchError, PageFetcher};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Plain-HTTP session against cardmarket.com. The client is built on first
/// navigation and kept for the life of the process, matching the one shared
/// browsing context the rest of the service assumes.
pub struct HttpPageFetcher {
    client: Option<reqwest::Client>,
}

impl HttpPageFetcher {
    pub fn new() -> Self {
        Self { client: None }
    }

    fn client(&mut self) -> Result<&reqwest::Client, FetchError> {
        if self.client.is_none() {
            let client = reqwest::Client::builder()
                .user_agent(BROWSER_USER_AGENT)
                .cookie_store(true)
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .map_err(|e| FetchError::Network(e.to_string()))?;
            info!("✅ Page-fetching session started");
            self.client = Some(client);
        }
        self.client
            .as_ref()
            .ok_or_else(|| FetchError::Network("session unavailable".to_string()))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn navigate(&mut self, url: &str) -> Result<Box<dyn DocumentQuery>, FetchError> {
        let client = self.client()?;

        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(e.to_string())
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadResponse(format!("status {status} for {url}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Box::new(HtmlDocument::new(body)))
    }

    async fn shutdown(&mut self) {
        if self.client.take().is_some() {
            info!("Page-fetching session closed");
        }
    }
}

/// Static-HTML implementation of the label lookup. Listing pages render the
/// price table as a definition list: a `dt` carries the label, the matching
/// `dd` (usually through an inner `span`) carries the displayed value.
pub struct HtmlDocument {
    body: String,
}

impl HtmlDocument {
    pub fn new(body: String) -> Self {
        Self { body }
    }

    fn find_value(&self, label: &str) -> Option<String> {
        let doc = Html::parse_document(&self.body);
        let dt_selector = Selector::parse("dt").ok()?;
        let span_selector = Selector::parse("span").ok()?;

        for dt in doc.select(&dt_selector) {
            let text: String = dt.text().collect();
            if !text.contains(label) {
                continue;
            }

            let dd = following_sibling(dt, "dd")?;
            let value = dd
                .select(&span_selector)
                .next()
                .map(|span| span.text().collect::<String>())
                .unwrap_or_else(|| dd.text().collect());

            let value = value.trim().to_string();
            return if value.is_empty() { None } else { Some(value) };
        }

        None
    }
}

fn following_sibling<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    let mut node = element.next_sibling();
    while let Some(current) = node {
        if let Some(sibling) = ElementRef::wrap(current) {
            if sibling.value().name() == name {
                return Some(sibling);
            }
        }
        node = current.next_sibling();
    }
    None
}

#[async_trait]
impl DocumentQuery for HtmlDocument {
    async fn value_after_label(&self, label: &str) -> Result<Option<String>, FetchError> {
        Ok(self.find_value(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_SNIPPET: &str = r#"
        <html><body>
          <dl>
            <dt>Available items</dt><dd>218</dd>
            <dt>Price Trend</dt><dd><span>12,34 €</span></dd>
            <dt>30-days average price</dt><dd><span>11,02 €</span></dd>
          </dl>
        </body></html>
    "#;

    #[tokio::test]
    async fn finds_value_following_label() {
        let doc = HtmlDocument::new(LISTING_SNIPPET.to_string());

        let trend = doc.value_after_label("Price Trend").await.unwrap();
        assert_eq!(trend.as_deref(), Some("12,34 €"));

        let avg = doc.value_after_label("30-days average price").await.unwrap();
        assert_eq!(avg.as_deref(), Some("11,02 €"));
    }

    #[tokio::test]
    async fn falls_back_to_dd_text_without_span() {
        let doc = HtmlDocument::new(LISTING_SNIPPET.to_string());

        let items = doc.value_after_label("Available items").await.unwrap();
        assert_eq!(items.as_deref(), Some("218"));
    }

    #[tokio::test]
    async fn missing_label_yields_none() {
        let doc = HtmlDocument::new(LISTING_SNIPPET.to_string());

        let missing = doc.value_after_label("1-day average price").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn empty_value_yields_none() {
        let doc = HtmlDocument::new(
            "<dl><dt>Price Trend</dt><dd><span>  </span></dd></dl>".to_string(),
        );

        let trend = doc.value_after_label("Price Trend").await.unwrap();
        assert!(trend.is_none());
    }
}
