//! Quality stage: scores a result against its task.
//!
//! The `light` profile never calls the reasoning service and reports a zero
//! fallback score. The `full` profile falls back to a neutral score on failure
//! so one transient outage does not trigger refinement by itself.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::models::{Phase, PhaseStatus, QualityProfile, QualityReport, Task, NEUTRAL_SCORE};
use crate::domain::ports::ReasoningService;
use crate::services::context::OrchestrationContext;
use crate::services::retry::RetryPolicy;

pub struct QualityStage {
    reasoning: Arc<dyn ReasoningService>,
    retry: RetryPolicy,
}

impl QualityStage {
    pub fn new(reasoning: Arc<dyn ReasoningService>, retry: RetryPolicy) -> Self {
        Self { reasoning, retry }
    }

    #[instrument(skip_all, fields(run_id = %ctx.run_id()))]
    pub async fn assess(
        &self,
        task: &Task,
        result: &str,
        ctx: &mut OrchestrationContext,
    ) -> QualityReport {
        if ctx.config().pipeline.quality_profile == QualityProfile::Light {
            debug!("light quality profile, skipping assessment");
            ctx.set_status(Phase::Quality, PhaseStatus::Fallback);
            return QualityReport::fallback(0.0);
        }

        let reasoning = &self.reasoning;
        let raw = self
            .retry
            .execute("assess_quality", || reasoning.assess_quality(task.text(), result))
            .await;

        match raw {
            Ok(raw) => {
                let report = raw.normalize();
                ctx.set_status(Phase::Quality, PhaseStatus::Success);
                info!(score = report.score, "quality assessed");
                report
            }
            Err(err) => {
                warn!(error = %err, score = NEUTRAL_SCORE, "quality assessment failed, using neutral score");
                ctx.set_status(Phase::Quality, PhaseStatus::Fallback);
                QualityReport::fallback(NEUTRAL_SCORE)
            }
        }
    }
}
