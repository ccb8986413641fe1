//! Client for OpenAI-compatible chat-completions endpoints.

use super::CompletionService;
use crate::config::{CallSettings, CompletionConfig};
use crate::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str =
    "You are a senior QA engineer who designs thorough, realistic tests for web applications.";

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiCompletion {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiCompletion {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_retries: 0,
            retry_delay: Duration::from_secs(2),
        }
    }

    /// Build a client from configuration, reading the API key from the environment
    pub fn from_config(config: &CompletionConfig) -> Result<Self, ServiceError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ServiceError::MissingApiKey(config.api_key_env.clone()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ServiceError::Request(e.to_string()))?;

        Ok(Self {
            client,
            ..Self::new(api_key, config.api_url.clone(), config.model.clone())
        }
        .with_max_retries(config.max_retries))
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn build_request<'a>(&'a self, prompt: &'a str, settings: CallSettings) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ApiMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }

    async fn send_once(&self, request: &ApiRequest<'_>) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(ServiceError::RateLimited(message));
            }
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ServiceError::EmptyResponse)
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn complete(&self, prompt: &str, settings: CallSettings) -> Result<String, ServiceError> {
        let request = self.build_request(prompt, settings);
        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    ::log::warn!(
                        "Completion request failed ({}), retry {} of {}",
                        e,
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
