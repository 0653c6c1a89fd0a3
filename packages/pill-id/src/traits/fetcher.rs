//! Document fetcher trait for the scraped reference site.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PillIdError, Result};

/// A fetched document, whatever its status.
///
/// Status handling is left to the caller: the pill-match boundary treats
/// anything but 200 as fatal, other boundaries may not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedDocument {
    /// Requested URL
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Raw body (HTML)
    pub body: String,

    /// When the document was fetched
    pub fetched_at: DateTime<Utc>,
}

impl FetchedDocument {
    /// Create a document with the given status.
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Create a 200 document.
    pub fn ok(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(url, 200, body)
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Return the body, or `SourceUnavailable` for any status but 200.
    pub fn require_ok(self) -> Result<String> {
        if self.is_ok() {
            Ok(self.body)
        } else {
            Err(PillIdError::SourceUnavailable {
                url: self.url,
                status: self.status,
            })
        }
    }
}

/// Fetches documents by URL.
///
/// Implementations:
/// - `HttpFetcher` - reqwest with transient-failure retry
/// - `RateLimitedFetcher` - wrapper that enforces a request rate
/// - `MockFetcher` - canned documents for tests
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch a document. Transport failures are errors, status codes are not.
    async fn fetch(&self, url: &str) -> Result<FetchedDocument>;

    /// Name of this fetcher for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_ok() {
        assert_eq!(
            FetchedDocument::ok("https://a", "<html/>").require_ok().unwrap(),
            "<html/>"
        );

        let err = FetchedDocument::new("https://a", 404, "").require_ok().unwrap_err();
        assert!(matches!(
            err,
            PillIdError::SourceUnavailable { status: 404, .. }
        ));
    }
}
