//! OpenAI implementation of the VisionModel trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use pill_id::vision::OpenAIVision;
//!
//! let vision = OpenAIVision::new("sk-...").with_model("gpt-4o");
//! let text = vision.describe(&bytes, "image/jpeg", DEFAULT_VISION_INSTRUCTION).await?;
//! ```

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{PillIdError, Result};
use crate::traits::vision::VisionModel;

/// OpenAI chat completions with image input.
pub struct OpenAIVision {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIVision {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::from(api_key.into()),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 512,
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| PillIdError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use an existing HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, image: &[u8], mime_type: &str, instruction: &str) -> serde_json::Value {
        let data_url = format!("data:{};base64,{}", mime_type, STANDARD.encode(image));
        serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": instruction },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }],
            "temperature": 0.0,
            "max_tokens": self.max_tokens
        })
    }
}

#[async_trait]
impl VisionModel for OpenAIVision {
    async fn describe(&self, image: &[u8], mime_type: &str, instruction: &str) -> Result<String> {
        info!(model = %self.model, bytes = image.len(), mime_type = %mime_type, "Describing image");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(image, mime_type, instruction))
            .send()
            .await
            .map_err(|e| PillIdError::Vision(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PillIdError::Vision(format!(
                "OpenAI returned {}: {}",
                status, error_text
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| PillIdError::Vision(e.to_string()))?;

        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| PillIdError::Vision("empty response from OpenAI".into()))?;

        debug!(model = %self.model, answer = %text, "Vision answer");
        Ok(text)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_embeds_data_url() {
        let vision = OpenAIVision::new("sk-test").with_model("gpt-4o-mini");
        let body = vision.request_body(&[0xff, 0xd8, 0xff], "image/jpeg", "Describe");

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["content"][0]["text"], "Describe");
        assert_eq!(
            body["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,/9j/"
        );
    }

    #[test]
    fn test_response_parsing() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Imprint: I-2"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Imprint: I-2"));
    }
}
