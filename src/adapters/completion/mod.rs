//! Completion backends behind the LLM reasoning and worker adapters.

pub mod anthropic_api;
pub mod claude_code;

use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ReasoningBackend, ReasoningConfig};
use crate::domain::ports::CompletionBackend;

pub use anthropic_api::{AnthropicApiBackend, AnthropicApiConfig};
pub use claude_code::{ClaudeCodeBackend, ClaudeCodeConfig};

/// Build the backend selected by the reasoning configuration.
pub fn create_backend(config: &ReasoningConfig) -> DomainResult<Arc<dyn CompletionBackend>> {
    Ok(match config.backend {
        ReasoningBackend::ClaudeCode => Arc::new(ClaudeCodeBackend::new(
            ClaudeCodeConfig::from_reasoning(config),
        )),
        ReasoningBackend::AnthropicApi => Arc::new(AnthropicApiBackend::new(
            AnthropicApiConfig::from_reasoning(config),
        )?),
    })
}
