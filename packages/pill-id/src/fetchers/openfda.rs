//! openFDA client for drug labeling and adverse event reports.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::http::{build_client, with_retry};
use crate::error::{PillIdError, Result};
use crate::traits::source::{StructuredEndpoint, StructuredSource};
use crate::types::config::HttpConfig;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// Structured source backed by the openFDA REST API.
#[derive(Clone)]
pub struct OpenFdaClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl OpenFdaClient {
    pub fn new(base_url: impl Into<String>, config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    /// Full query URL. `search` is percent-encoded here.
    pub fn query_url(
        &self,
        endpoint: StructuredEndpoint,
        search: &str,
        limit: usize,
    ) -> Result<Url> {
        let raw = format!("{}/{}", self.base_url, endpoint.path());
        let mut url = Url::parse(&raw).map_err(|_| PillIdError::InvalidUrl { url: raw })?;
        url.query_pairs_mut()
            .append_pair("search", search)
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }

    async fn query_once(&self, url: &Url) -> Result<Vec<Value>> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        // openFDA answers 404 when nothing matches
        if !status.is_success() {
            debug!(url = %url, status = status.as_u16(), "Structured query returned no data");
            return Ok(vec![]);
        }

        let body = response.text().await?;
        match serde_json::from_str::<QueryResponse>(&body) {
            Ok(parsed) => Ok(parsed.results),
            Err(e) => {
                warn!(url = %url, error = %e, "Unreadable structured response");
                Ok(vec![])
            }
        }
    }
}

#[async_trait]
impl StructuredSource for OpenFdaClient {
    async fn query(
        &self,
        endpoint: StructuredEndpoint,
        search: &str,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let url = self.query_url(endpoint, search, limit)?;
        let results = with_retry(self.max_retries, self.retry_backoff, url.as_str(), || {
            self.query_once(&url)
        })
        .await?;

        debug!(endpoint = endpoint.path(), search = %search, count = results.len(), "Structured query finished");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_url_encodes_search() {
        let client = OpenFdaClient::new("https://api.fda.gov/", &HttpConfig::default()).unwrap();
        let url = client
            .query_url(StructuredEndpoint::Label, "openfda.brand_name:\"Advil\"", 1)
            .unwrap();

        assert_eq!(url.path(), "/drug/label.json");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("search".to_string(), "openfda.brand_name:\"Advil\"".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let client = OpenFdaClient::new("not a url", &HttpConfig::default()).unwrap();
        let err = client
            .query_url(StructuredEndpoint::Event, "x", 10)
            .unwrap_err();
        assert!(matches!(err, PillIdError::InvalidUrl { .. }));
    }

    #[test]
    fn test_missing_results_deserializes_empty() {
        let parsed: QueryResponse =
            serde_json::from_str(r#"{"error":{"code":"NOT_FOUND"}}"#).unwrap();
        assert!(parsed.results.is_empty());
    }
}
