//! Browser capability used by the identifier handshake.
//!
//! Only four operations are needed: navigate, read the current URL, wait,
//! close. Process management of the browser itself is out of scope.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// One live browser session.
///
/// A session is exclusive to one resolution attempt and must be closed by
/// its owner on every exit path.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate the session to a URL.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// URL the session is currently showing.
    async fn current_url(&mut self) -> Result<String>;

    /// Wait for the page to settle.
    async fn wait(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Tear the session down.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>>;
}
