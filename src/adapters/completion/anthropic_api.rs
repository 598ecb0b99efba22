//! Anthropic Messages API completion backend.
//!
//! Non-streaming requests only. Rate limits and server errors are reported as
//! transient so the retry policy can try again; other client errors are permanent.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ReasoningConfig;
use crate::domain::ports::CompletionBackend;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic API backend.
#[derive(Debug, Clone)]
pub struct AnthropicApiConfig {
    /// API key (read from `ANTHROPIC_API_KEY` if not set).
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl AnthropicApiConfig {
    pub fn from_reasoning(config: &ReasoningConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        }
    }

    /// API key from config or environment.
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Completion backend calling the Messages API over HTTP.
pub struct AnthropicApiBackend {
    config: AnthropicApiConfig,
    client: Client,
}

impl AnthropicApiBackend {
    pub fn new(config: AnthropicApiConfig) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn classify(status: StatusCode, body: &str) -> DomainError {
        let message = format!("API error {status}: {body}");
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            DomainError::TransientReasoning(message)
        } else {
            DomainError::Config(message)
        }
    }
}

#[async_trait]
impl CompletionBackend for AnthropicApiBackend {
    fn name(&self) -> &'static str {
        "anthropic_api"
    }

    async fn complete(&self, system_prompt: &str, prompt: &str) -> DomainResult<String> {
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| DomainError::Config("ANTHROPIC_API_KEY not set".to_string()))?;

        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: (!system_prompt.is_empty()).then_some(system_prompt),
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::TransientReasoning(format!("API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify(status, &body));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| DomainError::MalformedResponse(format!("failed to parse response: {e}")))?;

        let text = parsed
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        debug!(chars = text.len(), "messages api completion received");
        Ok(text)
    }
}
