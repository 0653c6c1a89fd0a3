//! Configuration types for sources, HTTP and the identifier resolver.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the pipeline's external sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PillIdConfig {
    /// Pill-match search. Placeholders: `{imprint}`, `{color}`, `{shape}`.
    pub imprint_search_url: String,

    /// Interaction checker search. Placeholder: `{drug}`.
    pub interaction_search_url: String,

    /// Interactions report. Placeholder: `{drug_list}`.
    pub interaction_report_url: String,

    /// Base URL of the structured labeling / drug-event API.
    pub structured_base_url: String,

    /// Default number of labeling results per query.
    pub label_limit: usize,

    /// Default number of drug-event reports per query.
    pub event_limit: usize,

    /// Instruction sent with a pill photo.
    pub vision_instruction: String,

    pub resolver: ResolverConfig,

    pub http: HttpConfig,
}

impl Default for PillIdConfig {
    fn default() -> Self {
        Self {
            imprint_search_url:
                "https://www.drugs.com/imprints.php?imprint={imprint}&color={color}&shape={shape}"
                    .to_string(),
            interaction_search_url:
                "https://www.drugs.com/drug_interactions.html?searchterm={drug}".to_string(),
            interaction_report_url:
                "https://www.drugs.com/interactions-check.php?drug_list={drug_list}".to_string(),
            structured_base_url: "https://api.fda.gov".to_string(),
            label_limit: 1,
            event_limit: 10,
            vision_instruction: DEFAULT_VISION_INSTRUCTION.to_string(),
            resolver: ResolverConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Instruction asking for labeled lines, so the answer does not depend on
/// line order.
pub const DEFAULT_VISION_INSTRUCTION: &str = "Get the imprint, color, and shape of this pill. \
Answer with exactly three lines and no other commentary:\n\
Imprint: <imprint>\nColor: <color>\nShape: <shape>";

impl PillIdConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the structured data base URL.
    pub fn with_structured_base_url(mut self, url: impl Into<String>) -> Self {
        self.structured_base_url = url.into();
        self
    }

    /// Set the pill-match search template.
    pub fn with_imprint_search_url(mut self, template: impl Into<String>) -> Self {
        self.imprint_search_url = template.into();
        self
    }

    /// Set the interaction search and report templates.
    pub fn with_interaction_urls(
        mut self,
        search: impl Into<String>,
        report: impl Into<String>,
    ) -> Self {
        self.interaction_search_url = search.into();
        self.interaction_report_url = report.into();
        self
    }

    /// Set the resolver settings.
    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set the HTTP settings.
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Set the default labeling result limit.
    pub fn with_label_limit(mut self, limit: usize) -> Self {
        self.label_limit = limit;
        self
    }
}

/// Retry budget for the identifier handshake.
///
/// Attempt `n` waits `initial_delay + (n - 1) * delay_step` before reading
/// the redirected URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(with = "duration_millis")]
    pub initial_delay: Duration,

    #[serde(with = "duration_millis")]
    pub delay_step: Duration,

    /// Maximum number of attempts (at least 1).
    pub max_attempts: u32,

    /// Budget across all attempts.
    #[serde(with = "duration_millis")]
    pub total_timeout: Duration,

    /// Text that precedes the identifier in the redirected URL.
    pub marker: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            delay_step: Duration::from_secs(1),
            max_attempts: 5,
            total_timeout: Duration::from_secs(30),
            marker: "?drug_list=".to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delays(mut self, initial: Duration, step: Duration) -> Self {
        self.initial_delay = initial;
        self.delay_step = step;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = timeout;
        self
    }

    /// Delay used by the given 1-based attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay + self.delay_step * attempt.saturating_sub(1)
    }
}

/// HTTP client settings shared by the document and structured sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(with = "duration_millis")]
    pub timeout: Duration,

    pub user_agent: String,

    /// Retries for transient transport failures. Status codes are never retried.
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries.
    #[serde(with = "duration_millis")]
    pub retry_backoff: Duration,

    /// Request rate towards the scraped reference site.
    pub requests_per_second: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            // Browser-like User-Agent; the reference site rejects obvious bots
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            max_retries: 2,
            retry_backoff: Duration::from_millis(250),
            requests_per_second: 2,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
