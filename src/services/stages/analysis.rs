//! Analysis stage: task text to a structured [`AnalysisResult`].

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::models::{AnalysisResult, Phase, PhaseStatus, Task};
use crate::domain::ports::ReasoningService;
use crate::services::context::OrchestrationContext;
use crate::services::retry::RetryPolicy;

/// Produces task analyses, memoized through the context's analysis cache.
pub struct AnalysisStage {
    reasoning: Arc<dyn ReasoningService>,
    retry: RetryPolicy,
}

impl AnalysisStage {
    pub fn new(reasoning: Arc<dyn ReasoningService>, retry: RetryPolicy) -> Self {
        Self { reasoning, retry }
    }

    /// Analyze a task. Never fails: exhausted retries yield a word-count heuristic.
    #[instrument(skip_all, fields(run_id = %ctx.run_id()))]
    pub async fn analyze(&self, task: &Task, ctx: &mut OrchestrationContext) -> AnalysisResult {
        let key = task.normalized();

        if let Some(cached) = ctx.cache().get(key).await {
            debug!("analysis cache hit");
            ctx.set_status(Phase::Analysis, PhaseStatus::Cached);
            return cached;
        }

        let reasoning = &self.reasoning;
        let raw = self
            .retry
            .execute("analyze_task", || reasoning.analyze_task(key, false))
            .await;

        match raw {
            Ok(raw) => {
                let mut analysis = raw.normalize();
                if analysis.wants_enrichment() {
                    self.enrich(&mut analysis).await;
                }
                ctx.cache().insert(key, analysis.clone()).await;
                ctx.set_status(Phase::Analysis, PhaseStatus::Success);
                info!(
                    complexity = %analysis.complexity,
                    steps = analysis.steps,
                    capabilities = analysis.capabilities.len(),
                    "task analyzed"
                );
                analysis
            }
            Err(err) => {
                warn!(error = %err, "analysis failed, using word-count heuristic");
                ctx.set_status(Phase::Analysis, PhaseStatus::Fallback);
                AnalysisResult::heuristic(task.word_count())
            }
        }
    }

    /// One best-effort search call. Failures leave the analysis unchanged.
    async fn enrich(&self, analysis: &mut AnalysisResult) {
        let reasoning = &self.reasoning;
        let query = analysis.search_query.clone();
        match self
            .retry
            .execute("search_context", || reasoning.search_context(&query))
            .await
        {
            Ok(context) => {
                debug!(query = %query, chars = context.len(), "search context added");
                analysis.search_context = context;
            }
            Err(err) => {
                warn!(query = %query, error = %err, "search enrichment failed, continuing without it");
            }
        }
    }
}
