//! Completion backend port - raw text generation used by the LLM adapters.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// A text-in, text-out language model backend.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Complete `prompt` under `system_prompt` (may be empty).
    async fn complete(&self, system_prompt: &str, prompt: &str) -> DomainResult<String>;
}
