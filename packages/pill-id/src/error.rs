//! Typed errors for the pill identification library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Parsing dead ends (no interactions section, no candidates) are NOT
//! errors. They are represented as result values so that callers always
//! receive a well-formed shape. Only request-fatal and resource-level
//! failures surface here.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while resolving a pill or a drug.
#[derive(Debug, Error)]
pub enum PillIdError {
    /// The vision model's answer did not contain imprint, color and shape
    #[error("malformed feature text: {reason}")]
    MalformedFeatureText { reason: String },

    /// A document source answered with a non-200 status
    #[error("source unavailable: {url} returned HTTP {status}")]
    SourceUnavailable { url: String, status: u16 },

    /// The identifier handshake never produced a redirect
    #[error("could not resolve identifier for '{drug}' after {attempts} attempts ({elapsed:?})")]
    IdentifierResolutionTimeout {
        drug: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// Browser session could not be opened or driven
    #[error("browser error: {0}")]
    Browser(String),

    /// HTTP transport failed (connection, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Vision model unavailable or returned an unusable answer
    #[error("vision model error: {0}")]
    Vision(String),

    /// Invalid URL produced from a template
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,
}

impl PillIdError {
    /// Shorthand for a malformed feature text error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFeatureText {
            reason: reason.into(),
        }
    }

    /// Whether this error is a transient transport failure worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(source) => source
                .downcast_ref::<reqwest::Error>()
                .map(|e| e.is_timeout() || e.is_connect())
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for PillIdError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(Box::new(e))
    }
}

/// Result type alias for pill identification operations.
pub type Result<T> = std::result::Result<T, PillIdError>;
