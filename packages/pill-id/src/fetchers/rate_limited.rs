//! Rate-limited fetcher wrapper.
//!
//! Wraps any DocumentFetcher implementation with rate limiting using the governor crate.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::Result;
use crate::traits::fetcher::{DocumentFetcher, FetchedDocument};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A fetcher wrapper that enforces a request rate towards one site.
pub struct RateLimitedFetcher<F: DocumentFetcher> {
    inner: F,
    limiter: Arc<DefaultRateLimiter>,
}

impl<F: DocumentFetcher> RateLimitedFetcher<F> {
    /// Create a new rate-limited fetcher. A rate of zero is treated as one.
    pub fn new(fetcher: F, requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(fetcher, Quota::per_second(rate))
    }

    /// Create with a custom quota.
    pub fn with_quota(fetcher: F, quota: Quota) -> Self {
        Self {
            inner: fetcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// The wrapped fetcher.
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: DocumentFetcher> DocumentFetcher for RateLimitedFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        self.limiter.until_ready().await;
        self.inner.fetch(url).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
