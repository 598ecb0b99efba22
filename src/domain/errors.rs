//! Domain errors for the maestro orchestration pipeline.

use thiserror::Error;

/// Domain-level errors that can occur while orchestrating a task.
///
/// Only [`DomainError::RoutingUnavailable`] is allowed to abort a pipeline run.
/// Every other variant is contained at the stage boundary and downgraded to a
/// fallback payload.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Reasoning service call failed: {0}")]
    TransientReasoning(String),

    #[error("Reasoning service returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("No workers are registered; the task cannot be routed")]
    RoutingUnavailable,

    #[error("Worker '{worker}' failed: {message}")]
    WorkerExecution { worker: String, message: String },

    #[error("Worker '{worker}' timed out after {timeout_secs}s")]
    WorkerTimeout { worker: String, timeout_secs: u64 },

    #[error("Refinement unavailable: {0}")]
    RefinementUnavailable(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("History sink error: {0}")]
    History(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DomainError {
    /// Whether the retry wrapper should attempt the call again.
    ///
    /// Malformed responses are retried as well: the reasoning service is
    /// non-deterministic and may produce a valid payload on the next attempt.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientReasoning(_) | Self::MalformedResponse(_) | Self::WorkerTimeout { .. }
        )
    }

    /// Shorthand for a worker execution failure.
    pub fn worker(worker: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WorkerExecution {
            worker: worker.into(),
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::History(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}
