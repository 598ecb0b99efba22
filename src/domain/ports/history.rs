//! Execution history port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::RunRecord;

/// Sink for completed run records.
///
/// The pipeline records fire-and-forget: failures are logged and swallowed.
#[async_trait]
pub trait ExecutionHistorySink: Send + Sync {
    async fn record(&self, record: &RunRecord) -> DomainResult<()>;
}
