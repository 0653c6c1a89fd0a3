//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the pill
//! identification library without a browser, a vision model or network access.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{PillIdError, Result};
use crate::traits::{
    browser::{BrowserLauncher, BrowserSession},
    fetcher::{DocumentFetcher, FetchedDocument},
    source::{StructuredEndpoint, StructuredSource},
    vision::VisionModel,
};

/// A mock document fetcher serving canned pages.
///
/// Unknown URLs answer with an empty 404 document.
#[derive(Default, Clone)]
pub struct MockFetcher {
    documents: Arc<RwLock<HashMap<String, (u16, String)>>>,
    fetched: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 for `url`.
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_status(url, 200, body)
    }

    /// Serve `body` with the given status for `url`.
    pub fn with_status(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.documents
            .write()
            .unwrap()
            .insert(url.into(), (status, body.into()));
        self
    }

    /// URLs fetched so far, in order.
    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched.read().unwrap().clone()
    }
}

#[async_trait]
impl DocumentFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        self.fetched.write().unwrap().push(url.to_string());
        let doc = match self.documents.read().unwrap().get(url) {
            Some((status, body)) => FetchedDocument::new(url, *status, body.clone()),
            None => FetchedDocument::new(url, 404, ""),
        };
        Ok(doc)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Default)]
struct BrowserState {
    /// Where the n-th session lands after navigating; the last entry
    /// repeats. `None` (or an empty list) stays on the navigated page.
    landings: Vec<Option<String>>,
    navigate_delay: Duration,
    failing_fragment: Option<String>,
    unavailable: bool,
    opened: u32,
    closed: u32,
    waits: Vec<Duration>,
    visited: Vec<String>,
}

/// A mock browser whose sessions either stay on the navigated page or
/// jump to a configured landing URL.
///
/// Clones share state, so a clone handed to the code under test can be
/// inspected afterwards.
#[derive(Default, Clone)]
pub struct MockBrowser {
    state: Arc<RwLock<BrowserState>>,
}

impl MockBrowser {
    fn with_state(state: BrowserState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Every session stays on whatever page it navigated to.
    pub fn never_redirects() -> Self {
        Self::default()
    }

    /// Every session lands on `url` after navigating.
    pub fn redirects_to(url: impl Into<String>) -> Self {
        Self::redirects_after(1, url)
    }

    /// Sessions opened before the `attempt`-th one do not redirect.
    pub fn redirects_after(attempt: u32, url: impl Into<String>) -> Self {
        let mut landings = vec![None; attempt.saturating_sub(1) as usize];
        landings.push(Some(url.into()));
        Self::lands_on(landings)
    }

    /// The n-th session lands on `landings[n - 1]`, the last entry repeating.
    pub fn lands_on(landings: Vec<Option<String>>) -> Self {
        Self::with_state(BrowserState {
            landings,
            ..Default::default()
        })
    }

    /// Opening a session always fails.
    pub fn unavailable() -> Self {
        Self::with_state(BrowserState {
            unavailable: true,
            ..Default::default()
        })
    }

    /// Every `navigate` call takes `delay` before returning.
    pub fn with_navigate_delay(self, delay: Duration) -> Self {
        self.state.write().unwrap().navigate_delay = delay;
        self
    }

    /// Navigating to a URL containing `fragment` fails with a `Browser` error.
    pub fn with_navigation_failure(self, fragment: impl Into<String>) -> Self {
        self.state.write().unwrap().failing_fragment = Some(fragment.into());
        self
    }

    pub fn opened(&self) -> u32 {
        self.state.read().unwrap().opened
    }

    pub fn closed(&self) -> u32 {
        self.state.read().unwrap().closed
    }

    /// Durations passed to `wait`, across all sessions.
    pub fn waits(&self) -> Vec<Duration> {
        self.state.read().unwrap().waits.clone()
    }

    /// URLs navigated to, across all sessions.
    pub fn visited(&self) -> Vec<String> {
        self.state.read().unwrap().visited.clone()
    }
}

#[async_trait]
impl BrowserLauncher for MockBrowser {
    async fn open(&self) -> Result<Box<dyn BrowserSession>> {
        let mut state = self.state.write().unwrap();
        if state.unavailable {
            return Err(PillIdError::Browser("mock browser unavailable".into()));
        }
        state.opened += 1;

        let index = (state.opened as usize - 1).min(state.landings.len().saturating_sub(1));
        let landing = state.landings.get(index).cloned().flatten();

        Ok(Box::new(MockBrowserSession {
            state: Arc::clone(&self.state),
            landing,
            current: "about:blank".to_string(),
        }))
    }
}

struct MockBrowserSession {
    state: Arc<RwLock<BrowserState>>,
    landing: Option<String>,
    current: String,
}

#[async_trait]
impl BrowserSession for MockBrowserSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let (delay, fails) = {
            let mut state = self.state.write().unwrap();
            state.visited.push(url.to_string());
            let fails = state
                .failing_fragment
                .as_deref()
                .is_some_and(|fragment| url.contains(fragment));
            (state.navigate_delay, fails)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fails {
            return Err(PillIdError::Browser(format!("navigation to {} failed", url)));
        }

        self.current = self.landing.clone().unwrap_or_else(|| url.to_string());
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.current.clone())
    }

    async fn wait(&mut self, duration: Duration) {
        self.state.write().unwrap().waits.push(duration);
        tokio::time::sleep(duration).await;
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.write().unwrap().closed += 1;
        Ok(())
    }
}

/// A mock structured source answering by exact search expression.
///
/// Unknown searches yield no results, as the real source does.
#[derive(Default, Clone)]
pub struct MockStructuredSource {
    results: Arc<RwLock<HashMap<String, Vec<Value>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<MockSourceCall>>>,
}

/// Record of a query made to the mock source.
#[derive(Debug, Clone)]
pub struct MockSourceCall {
    pub endpoint: StructuredEndpoint,
    pub search: String,
    pub limit: usize,
}

impl MockStructuredSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results returned for a search expression, truncated to the query limit.
    pub fn with_results(self, search: impl Into<String>, results: Vec<Value>) -> Self {
        self.results.write().unwrap().insert(search.into(), results);
        self
    }

    /// Querying `search` fails with a 503 `SourceUnavailable`.
    pub fn with_failure(self, search: impl Into<String>) -> Self {
        self.failing.write().unwrap().insert(search.into());
        self
    }

    pub fn calls(&self) -> Vec<MockSourceCall> {
        self.calls.read().unwrap().clone()
    }

    /// Search expressions queried so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.search).collect()
    }

    pub fn query_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl StructuredSource for MockStructuredSource {
    async fn query(
        &self,
        endpoint: StructuredEndpoint,
        search: &str,
        limit: usize,
    ) -> Result<Vec<Value>> {
        self.calls.write().unwrap().push(MockSourceCall {
            endpoint,
            search: search.to_string(),
            limit,
        });

        if self.failing.read().unwrap().contains(search) {
            return Err(PillIdError::SourceUnavailable {
                url: format!("mock://{}", endpoint.path()),
                status: 503,
            });
        }

        Ok(self
            .results
            .read()
            .unwrap()
            .get(search)
            .map(|results| results.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// A mock vision model with a fixed answer.
#[derive(Default, Clone)]
pub struct MockVision {
    answer: Option<String>,
    calls: Arc<RwLock<Vec<MockVisionCall>>>,
}

/// Record of a call made to the mock vision model.
#[derive(Debug, Clone)]
pub struct MockVisionCall {
    pub mime_type: String,
    pub instruction: String,
    pub image_len: usize,
}

impl MockVision {
    /// Always answers `text`.
    pub fn answering(text: impl Into<String>) -> Self {
        Self {
            answer: Some(text.into()),
            ..Default::default()
        }
    }

    /// Always fails with a `Vision` error.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MockVisionCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl VisionModel for MockVision {
    async fn describe(&self, image: &[u8], mime_type: &str, instruction: &str) -> Result<String> {
        self.calls.write().unwrap().push(MockVisionCall {
            mime_type: mime_type.to_string(),
            instruction: instruction.to_string(),
            image_len: image.len(),
        });

        self.answer
            .clone()
            .ok_or_else(|| PillIdError::Vision("mock vision unavailable".into()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
