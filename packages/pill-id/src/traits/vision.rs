//! Vision-language model boundary.

use async_trait::async_trait;

use crate::error::Result;

/// Turns an image plus an instruction into free text.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn describe(&self, image: &[u8], mime_type: &str, instruction: &str) -> Result<String>;

    /// Model name for logging.
    fn name(&self) -> &str;
}
