use anyhow::{Context, Result};
use dotenvy::dotenv;
use pill_id::{HttpConfig, PillIdConfig, ResolverConfig};
use std::env;
use std::time::Duration;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Only needed by the image commands
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub webdriver_url: String,
    pub openfda_base_url: String,
    pub resolver_max_attempts: u32,
    pub resolver_timeout: Duration,
    pub scrape_requests_per_second: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:4444".to_string()),
            openfda_base_url: env::var("OPENFDA_BASE_URL")
                .unwrap_or_else(|_| "https://api.fda.gov".to_string()),
            resolver_max_attempts: env::var("RESOLVER_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("RESOLVER_MAX_ATTEMPTS must be a valid number")?,
            resolver_timeout: Duration::from_secs(
                env::var("RESOLVER_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("RESOLVER_TIMEOUT_SECS must be a valid number")?,
            ),
            scrape_requests_per_second: env::var("SCRAPE_REQUESTS_PER_SECOND")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .context("SCRAPE_REQUESTS_PER_SECOND must be a valid number")?,
        })
    }

    /// Library configuration derived from the environment.
    pub fn pill_config(&self) -> PillIdConfig {
        let http = HttpConfig {
            requests_per_second: self.scrape_requests_per_second,
            ..HttpConfig::default()
        };
        let resolver = ResolverConfig::new()
            .with_max_attempts(self.resolver_max_attempts)
            .with_total_timeout(self.resolver_timeout);

        PillIdConfig::new()
            .with_structured_base_url(&self.openfda_base_url)
            .with_http(http)
            .with_resolver(resolver)
    }
}
