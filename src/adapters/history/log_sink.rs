//! History sink that writes run records to the log.

use async_trait::async_trait;
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::RunRecord;
use crate::domain::ports::ExecutionHistorySink;

/// Logs each run summary at info level. Used when the SQLite history is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHistorySink;

#[async_trait]
impl ExecutionHistorySink for TracingHistorySink {
    async fn record(&self, record: &RunRecord) -> DomainResult<()> {
        info!(
            run_id = %record.run_id,
            mode = %record.mode,
            agents = ?record.assigned_agents,
            quality_score = record.quality_score,
            judge_score = ?record.judge_score,
            refinement_rounds = record.refinement_rounds,
            edge_cases = record.edge_cases.len(),
            "run completed"
        );
        Ok(())
    }
}
