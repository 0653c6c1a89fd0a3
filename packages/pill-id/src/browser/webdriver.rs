//! W3C WebDriver client for the identifier handshake.
//!
//! Talks to a running WebDriver endpoint (chromedriver, selenium) over
//! plain HTTP. Each [`WebDriverLauncher::open`] creates a fresh headless
//! session and [`BrowserSession::close`] deletes it.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{PillIdError, Result};
use crate::traits::browser::{BrowserLauncher, BrowserSession};
use crate::types::config::HttpConfig;

/// WebDriver wraps every answer in `{"value": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// Launches headless browser sessions on a WebDriver endpoint.
#[derive(Clone)]
pub struct WebDriverLauncher {
    client: reqwest::Client,
    endpoint: String,
    user_agent: String,
    headless: bool,
}

impl WebDriverLauncher {
    /// `endpoint` is the WebDriver base URL, e.g. `http://localhost:4444`.
    pub fn new(endpoint: impl Into<String>, http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(http.timeout)
            .build()
            .map_err(|e| PillIdError::Config(format!("failed to create WebDriver client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            user_agent: http.user_agent.clone(),
            headless: true,
        })
    }

    /// Show the browser window. Useful when debugging the handshake locally.
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Capabilities payload for `POST /session`.
    pub fn capabilities(&self) -> Value {
        let mut args = vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            format!("--user-agent={}", self.user_agent),
        ];
        if self.headless {
            args.insert(0, "--headless=new".to_string());
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserSession>> {
        let response = self
            .client
            .post(format!("{}/session", self.endpoint))
            .json(&self.capabilities())
            .send()
            .await
            .map_err(|e| PillIdError::Browser(format!("WebDriver unreachable: {}", e)))?;

        let created: Envelope<NewSession> = read_envelope(response).await?;
        info!(session = %created.value.session_id, "Opened browser session");

        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            base: format!("{}/session/{}", self.endpoint, created.value.session_id),
            session_id: created.value.session_id,
        }))
    }
}

/// One WebDriver session.
pub struct WebDriverSession {
    client: reqwest::Client,
    base: String,
    session_id: String,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        debug!(session = %self.session_id, url = %url, "Navigating");
        let response = self
            .client
            .post(format!("{}/url", self.base))
            .json(&json!({ "url": url }))
            .send()
            .await
            .map_err(browser_error)?;
        let _: Envelope<Value> = read_envelope(response).await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/url", self.base))
            .send()
            .await
            .map_err(browser_error)?;
        let current: Envelope<String> = read_envelope(response).await?;
        Ok(current.value)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let response = self
            .client
            .delete(&self.base)
            .send()
            .await
            .map_err(browser_error)?;
        let _: Envelope<Value> = read_envelope(response).await?;
        debug!(session = %self.session_id, "Closed browser session");
        Ok(())
    }
}

fn browser_error(e: reqwest::Error) -> PillIdError {
    PillIdError::Browser(e.to_string())
}

async fn read_envelope<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Envelope<T>> {
    let status = response.status();
    let body = response.text().await.map_err(browser_error)?;

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.pointer("/value/message").and_then(Value::as_str).map(String::from))
            .unwrap_or(body);
        return Err(PillIdError::Browser(format!(
            "WebDriver returned {}: {}",
            status.as_u16(),
            message
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| PillIdError::Browser(format!("unexpected WebDriver response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_are_headless_by_default() {
        let launcher = WebDriverLauncher::new("http://localhost:4444/", &HttpConfig::default()).unwrap();
        assert_eq!(launcher.endpoint, "http://localhost:4444");

        let caps = launcher.capabilities();
        let args = caps
            .pointer("/capabilities/alwaysMatch/goog:chromeOptions/args")
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(args[0], "--headless=new");
        assert!(args.iter().any(|a| a.as_str().unwrap().starts_with("--user-agent=")));

        let caps = launcher.with_headless(false).capabilities();
        assert!(!caps.to_string().contains("--headless"));
    }

    #[test]
    fn test_session_envelope() {
        let parsed: Envelope<NewSession> = serde_json::from_str(
            r#"{"value":{"sessionId":"abc123","capabilities":{"browserName":"chrome"}}}"#,
        )
        .unwrap();
        assert_eq!(parsed.value.session_id, "abc123");

        let url: Envelope<String> =
            serde_json::from_str(r#"{"value":"https://www.drugs.com/"}"#).unwrap();
        assert_eq!(url.value, "https://www.drugs.com/");

        let null: Envelope<Value> = serde_json::from_str(r#"{"value":null}"#).unwrap();
        assert!(null.value.is_null());
    }
}
