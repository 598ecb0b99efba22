//! LLM-backed worker runtime.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::adapters::registry::StaticWorkerRegistry;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{CompletionBackend, WorkerRuntime};

/// Runs registered workers by prompting a completion backend.
///
/// A worker's registry description becomes its system prompt.
pub struct LlmWorkerRuntime<B: ?Sized + CompletionBackend = dyn CompletionBackend> {
    backend: Arc<B>,
    registry: Arc<StaticWorkerRegistry>,
}

impl<B: ?Sized + CompletionBackend> LlmWorkerRuntime<B> {
    pub fn new(backend: Arc<B>, registry: Arc<StaticWorkerRegistry>) -> Self {
        Self { backend, registry }
    }

    fn system_prompt(worker: &str, description: &str) -> String {
        if description.trim().is_empty() {
            format!("You are {worker}, a specialist worker in a multi-agent team.")
        } else {
            format!("You are {worker}, a specialist worker in a multi-agent team. {description}")
        }
    }
}

#[async_trait]
impl<B: ?Sized + CompletionBackend> WorkerRuntime for LlmWorkerRuntime<B> {
    #[instrument(skip(self, prompt), fields(backend = self.backend.name()))]
    async fn run(&self, worker: &str, prompt: &str) -> DomainResult<String> {
        let description = self
            .registry
            .description(worker)
            .ok_or_else(|| DomainError::worker(worker, "worker is not registered"))?;

        let output = self
            .backend
            .complete(&Self::system_prompt(worker, description), prompt)
            .await
            .map_err(|err| DomainError::worker(worker, err.to_string()))?;

        debug!(chars = output.len(), "worker finished");
        Ok(output)
    }
}
