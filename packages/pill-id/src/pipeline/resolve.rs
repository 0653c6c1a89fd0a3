//! Identifier resolver: free-text drug name → opaque [`DrugIdentifier`].
//!
//! The interaction checker only accepts its own identifiers. They are
//! recovered by opening the search page in a browser and reading the URL
//! the site redirects to (`...?drug_list=243-0`).
//!
//! The redirect is not instant, so each attempt waits a little longer than
//! the previous one. Attempts are bounded by count and by a total budget.
//! The budget covers the whole attempt (launch, navigation and URL reads),
//! not just the wait. Every attempt owns exactly one browser session which
//! is closed before the next attempt starts.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{PillIdError, Result};
use crate::traits::browser::{BrowserLauncher, BrowserSession};
use crate::types::config::ResolverConfig;
use crate::types::interaction::DrugIdentifier;

/// Outcome of a single attempt.
enum Attempt {
    Resolved(DrugIdentifier),
    Unchanged,
    /// The remaining budget ran out mid-attempt.
    OutOfTime,
}

/// Resolves drug names through a browser-driven redirect handshake.
#[derive(Clone)]
pub struct IdentifierResolver {
    launcher: Arc<dyn BrowserLauncher>,
    search_url_template: String,
    config: ResolverConfig,
}

impl IdentifierResolver {
    /// `search_url_template` must contain a `{drug}` placeholder.
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        search_url_template: impl Into<String>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            launcher,
            search_url_template: search_url_template.into(),
            config,
        }
    }

    /// Search URL for a drug name.
    pub fn search_url(&self, drug: &str) -> String {
        self.search_url_template
            .replace("{drug}", &urlencoding::encode(drug.trim()))
    }

    /// Resolve a drug name, retrying until the budget runs out.
    pub async fn resolve(&self, drug: &str, cancel: &CancellationToken) -> Result<DrugIdentifier> {
        let search_url = self.search_url(drug);
        let started = Instant::now();
        let mut attempts = 0;

        while attempts < self.config.max_attempts {
            let elapsed = started.elapsed();
            if elapsed >= self.config.total_timeout {
                break;
            }
            if cancel.is_cancelled() {
                return Err(PillIdError::Cancelled);
            }

            attempts += 1;
            let remaining = self.config.total_timeout - elapsed;
            let delay = self.config.delay_for_attempt(attempts).min(remaining);

            debug!(drug = %drug, attempt = attempts, delay_ms = delay.as_millis() as u64, "Resolving identifier");

            match self.attempt(&search_url, delay, remaining, cancel).await? {
                Attempt::Resolved(id) => {
                    info!(drug = %drug, identifier = %id, attempts, "Resolved drug identifier");
                    return Ok(id);
                }
                Attempt::Unchanged => {
                    debug!(drug = %drug, attempt = attempts, "No redirect yet");
                }
                Attempt::OutOfTime => {
                    debug!(drug = %drug, attempt = attempts, "Attempt overran the remaining budget");
                    break;
                }
            }
        }

        let elapsed = started.elapsed();
        warn!(drug = %drug, attempts, elapsed_ms = elapsed.as_millis() as u64, "Identifier resolution exhausted its budget");
        Err(PillIdError::IdentifierResolutionTimeout {
            drug: drug.to_string(),
            attempts,
            elapsed,
        })
    }

    /// One attempt with its own session, bounded by `remaining`. The
    /// session is closed on every path out of here, including errors,
    /// cancellation and overrunning the budget.
    async fn attempt(
        &self,
        search_url: &str,
        delay: Duration,
        remaining: Duration,
        cancel: &CancellationToken,
    ) -> Result<Attempt> {
        let deadline = tokio::time::Instant::now() + remaining;

        let mut session = tokio::select! {
            opened = tokio::time::timeout_at(deadline, self.launcher.open()) => match opened {
                Ok(session) => session?,
                Err(_) => return Ok(Attempt::OutOfTime),
            },
            _ = cancel.cancelled() => return Err(PillIdError::Cancelled),
        };

        let outcome = tokio::select! {
            result = tokio::time::timeout_at(deadline, self.drive(session.as_mut(), search_url, delay)) => {
                result.unwrap_or(Ok(Attempt::OutOfTime))
            }
            _ = cancel.cancelled() => Err(PillIdError::Cancelled),
        };

        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close browser session");
        }

        outcome
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        search_url: &str,
        delay: Duration,
    ) -> Result<Attempt> {
        let before = session.current_url().await?;
        session.navigate(search_url).await?;
        session.wait(delay).await;
        let after = session.current_url().await?;

        if after == before || after == search_url {
            return Ok(Attempt::Unchanged);
        }

        Ok(extract_identifier(&after, &self.config.marker)
            .map(Attempt::Resolved)
            .unwrap_or(Attempt::Unchanged))
    }
}

/// Everything after the first occurrence of `marker`.
pub fn extract_identifier(url: &str, marker: &str) -> Option<DrugIdentifier> {
    let (_, rest) = url.split_once(marker)?;
    DrugIdentifier::new(rest)
}
