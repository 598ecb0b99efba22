//! Progress stage: decides whether an execution result moves the task forward.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::models::{Phase, PhaseStatus, ProgressReport, Task};
use crate::domain::ports::ReasoningService;
use crate::services::context::OrchestrationContext;
use crate::services::retry::RetryPolicy;

pub struct ProgressStage {
    reasoning: Arc<dyn ReasoningService>,
    retry: RetryPolicy,
}

impl ProgressStage {
    pub fn new(reasoning: Arc<dyn ReasoningService>, retry: RetryPolicy) -> Self {
        Self { reasoning, retry }
    }

    #[instrument(skip_all, fields(run_id = %ctx.run_id()))]
    pub async fn evaluate(
        &self,
        task: &Task,
        result: &str,
        ctx: &mut OrchestrationContext,
    ) -> ProgressReport {
        let reasoning = &self.reasoning;
        let raw = self
            .retry
            .execute("evaluate_progress", || {
                reasoning.evaluate_progress(task.text(), result)
            })
            .await;

        match raw {
            Ok(raw) => {
                let report = raw.normalize();
                ctx.set_status(Phase::Progress, PhaseStatus::Success);
                info!(action = report.action.as_str(), "progress evaluated");
                report
            }
            Err(err) => {
                warn!(error = %err, "progress evaluation failed, continuing");
                ctx.set_status(Phase::Progress, PhaseStatus::Fallback);
                ProgressReport::fallback()
            }
        }
    }
}
