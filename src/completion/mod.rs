//! Text-generation completion service used by feature identification and
//! scenario synthesis.

pub mod openai;

use crate::config::CallSettings;
use crate::error::ServiceError;
use async_trait::async_trait;

pub use openai::OpenAiCompletion;

/// Turns a plain-text prompt into generated text
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str, settings: CallSettings) -> Result<String, ServiceError>;
}
