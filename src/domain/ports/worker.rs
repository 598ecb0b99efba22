//! Worker ports - execution backends and the registry of named workers.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::errors::DomainResult;

/// Runs a named worker on a prompt.
///
/// No built-in retry: the pipeline never retries worker execution.
#[async_trait]
pub trait WorkerRuntime: Send + Sync {
    async fn run(&self, worker: &str, prompt: &str) -> DomainResult<String>;
}

/// Read-only catalogue of available workers.
pub trait WorkerRegistry: Send + Sync {
    /// Worker name to description.
    fn list_workers(&self) -> BTreeMap<String, String>;

    /// Worker names in registration order.
    fn worker_names(&self) -> Vec<String> {
        self.list_workers().into_keys().collect()
    }

    fn contains(&self, worker: &str) -> bool {
        self.list_workers().contains_key(worker)
    }

    fn is_empty(&self) -> bool {
        self.list_workers().is_empty()
    }
}
