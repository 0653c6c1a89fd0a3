//! HTTP document fetcher.
//!
//! Fetches pages with a browser-like client. Transient transport failures
//! (connect errors, timeouts) are retried with exponential backoff; HTTP
//! status codes are returned as-is and never retried.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{PillIdError, Result};
use crate::traits::fetcher::{DocumentFetcher, FetchedDocument};
use crate::types::config::HttpConfig;

/// Build the shared reqwest client from HTTP settings.
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"),
    );

    reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| PillIdError::Config(format!("failed to create HTTP client: {}", e)))
}

/// Upper bound for a single retry delay.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Delay before retry number `retry` (zero-based): `backoff * 2^retry`,
/// capped at [`MAX_BACKOFF`].
fn backoff_delay(backoff: Duration, retry: u32) -> Duration {
    backoff
        .saturating_mul(2u32.saturating_pow(retry))
        .min(MAX_BACKOFF)
}

/// Run `op` and retry transient failures up to `max_retries` times.
pub(crate) async fn with_retry<T, F, Fut>(
    max_retries: u32,
    backoff: Duration,
    url: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut retry = 0;
    loop {
        match op().await {
            Err(e) if e.is_transient() && retry < max_retries => {
                let delay = backoff_delay(backoff, retry);
                retry += 1;
                warn!(url = %url, error = %e, retry, delay_ms = delay.as_millis() as u64, "Transient HTTP failure, retrying");
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

/// Fetches documents over HTTP.
///
/// # Example
///
/// ```rust,ignore
/// use pill_id::fetchers::{HttpFetcher, RateLimitedFetcher};
///
/// let fetcher = RateLimitedFetcher::new(HttpFetcher::new(&HttpConfig::default())?, 2);
/// let doc = fetcher.fetch("https://www.drugs.com/imprints.php?imprint=I-2").await?;
/// ```
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with its own client.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self::with_client(build_client(config)?, config))
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: reqwest::Client, config: &HttpConfig) -> Self {
        Self {
            client,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedDocument> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchedDocument::new(url, status, body))
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        debug!(url = %url, "HTTP fetch starting");
        let doc = with_retry(self.max_retries, self.retry_backoff, url, || {
            self.fetch_once(url)
        })
        .await?;
        debug!(url = %url, status = doc.status, bytes = doc.body.len(), "HTTP fetch finished");
        Ok(doc)
    }

    fn name(&self) -> &str {
        "http"
    }
}
