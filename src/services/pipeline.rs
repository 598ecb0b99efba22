//! Pipeline driver: wires the six stages into one run.
//!
//! Analysis → Routing → Execution → Progress → Quality → Judge/Refine, strictly
//! in order. Each stage emits a [`StageEvent`] when it finishes; the run ends
//! with a terminal `Completed` or `Failed` event. Only routing with zero
//! registered workers aborts a run.

use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Config, FinalResult, Phase, PhaseStatus, RunRecord, StageEvent, StagePayload, Task,
};
use crate::domain::ports::{ExecutionHistorySink, ReasoningService, WorkerRegistry, WorkerRuntime};
use crate::services::analysis_cache::AnalysisCache;
use crate::services::context::OrchestrationContext;
use crate::services::retry::RetryPolicy;
use crate::services::stages::{
    AnalysisStage, ExecutionDispatcher, JudgeStage, ProgressStage, QualityStage, RoutingStage,
};

/// Buffer for stage events: six stages plus the terminal event fit without blocking.
const EVENT_BUFFER: usize = 16;

struct Stages {
    analysis: AnalysisStage,
    routing: RoutingStage,
    execution: ExecutionDispatcher,
    progress: ProgressStage,
    quality: QualityStage,
    judge: JudgeStage,
}

/// Runs tasks through the staged pipeline.
///
/// Cheap to clone; clones share the stages, the analysis cache and the
/// history sink.
#[derive(Clone)]
pub struct PipelineDriver {
    config: Arc<Config>,
    registry: Arc<dyn WorkerRegistry>,
    cache: AnalysisCache,
    history: Option<Arc<dyn ExecutionHistorySink>>,
    pending_history: Arc<Mutex<Vec<JoinHandle<()>>>>,
    stages: Arc<Stages>,
}

impl PipelineDriver {
    pub fn new(
        config: Config,
        reasoning: Arc<dyn ReasoningService>,
        runtime: Arc<dyn WorkerRuntime>,
        registry: Arc<dyn WorkerRegistry>,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.pipeline.retry);
        let cache = AnalysisCache::from_config(&config.pipeline);
        let stages = Stages {
            analysis: AnalysisStage::new(Arc::clone(&reasoning), retry.clone()),
            routing: RoutingStage::new(Arc::clone(&reasoning), retry.clone()),
            execution: ExecutionDispatcher::new(Arc::clone(&runtime)),
            progress: ProgressStage::new(Arc::clone(&reasoning), retry.clone()),
            quality: QualityStage::new(reasoning, retry),
            judge: JudgeStage::new(runtime),
        };

        Self {
            config: Arc::new(config),
            registry,
            cache,
            history: None,
            pending_history: Arc::new(Mutex::new(Vec::new())),
            stages: Arc::new(stages),
        }
    }

    /// Record every finished run to `sink`.
    pub fn with_history(mut self, sink: Arc<dyn ExecutionHistorySink>) -> Self {
        self.history = Some(sink);
        self
    }

    /// Wait for history writes started by finished runs.
    pub async fn flush_history(&self) {
        let handles = std::mem::take(
            &mut *self
                .pending_history
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "history write task failed");
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub const fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Run a task to completion.
    pub async fn run_pipeline(&self, task: impl Into<Task>) -> DomainResult<FinalResult> {
        let (tx, _rx) = mpsc::channel(EVENT_BUFFER);
        self.run_with_events(task.into(), tx).await
    }

    /// Run a task on a background task, streaming one event per stage.
    ///
    /// The last event received is always terminal.
    pub fn stream_pipeline(&self, task: impl Into<Task>) -> mpsc::Receiver<StageEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let driver = self.clone();
        let task = task.into();

        tokio::spawn(async move {
            let _ = driver.run_with_events(task, tx).await;
        });
        rx
    }

    /// Run a task, sending stage events to `event_tx`.
    ///
    /// Send failures (a dropped receiver) are ignored; the run always completes.
    #[instrument(skip_all, fields(task_chars = task.text().len()))]
    pub async fn run_with_events(
        &self,
        task: Task,
        event_tx: mpsc::Sender<StageEvent>,
    ) -> DomainResult<FinalResult> {
        let stages = &self.stages;
        let mut ctx = OrchestrationContext::new(
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
            self.cache.clone(),
        )
        .with_history(self.history.clone());
        info!(run_id = %ctx.run_id(), "pipeline run started");

        let started = Instant::now();
        let analysis = stages.analysis.analyze(&task, &mut ctx).await;
        finish_phase(&mut ctx, &event_tx, started, StagePayload::Analysis(analysis.clone())).await;

        let started = Instant::now();
        let routing = match stages.routing.route(&task, &analysis, &mut ctx).await {
            Ok(plan) => plan,
            Err(err) => {
                ctx.record_timing(Phase::Routing, started.elapsed());
                warn!(run_id = %ctx.run_id(), error = %err, "pipeline run aborted at routing");
                let _ = event_tx
                    .send(StageEvent::Failed {
                        phase: Phase::Routing,
                        error: err.to_string(),
                    })
                    .await;
                return Err(err);
            }
        };
        finish_phase(&mut ctx, &event_tx, started, StagePayload::Routing(routing.clone())).await;

        let started = Instant::now();
        let execution = stages.execution.execute(&routing, &task, &mut ctx).await;
        finish_phase(&mut ctx, &event_tx, started, StagePayload::Execution(execution.clone())).await;

        let started = Instant::now();
        let progress = stages.progress.evaluate(&task, &execution.result, &mut ctx).await;
        finish_phase(&mut ctx, &event_tx, started, StagePayload::Progress(progress.clone())).await;

        let started = Instant::now();
        let quality = stages.quality.assess(&task, &execution.result, &mut ctx).await;
        finish_phase(&mut ctx, &event_tx, started, StagePayload::Quality(quality.clone())).await;

        let started = Instant::now();
        let judged = stages
            .judge
            .judge(&task, execution.result.clone(), quality, &mut ctx)
            .await;
        finish_phase(
            &mut ctx,
            &event_tx,
            started,
            StagePayload::Judge {
                terminal: judged.terminal,
                evaluations: judged.evaluations.clone(),
                refinement_rounds: judged.refinement_rounds,
            },
        )
        .await;

        let finished_at = Utc::now();
        let mut metadata = Map::new();
        metadata.insert("run_id".into(), json!(ctx.run_id()));
        metadata.insert("started_at".into(), json!(ctx.started_at().to_rfc3339()));
        metadata.insert("finished_at".into(), json!(finished_at.to_rfc3339()));
        for (key, value) in task.metadata() {
            metadata.insert(key.clone(), Value::String(value.clone()));
        }
        metadata.insert("edge_cases".into(), json!(ctx.edge_cases()));
        metadata.insert("judge_terminal".into(), json!(judged.terminal));
        metadata.insert("refinement_rounds".into(), json!(judged.refinement_rounds));
        metadata.insert("fallback_refined".into(), json!(judged.fallback_refined));
        metadata.insert("judge_gated".into(), json!(judged.gated));

        let result = FinalResult {
            run_id: ctx.run_id(),
            task: task.text().to_string(),
            final_result: judged.result,
            analysis,
            routing,
            execution,
            progress,
            quality: judged.quality,
            judge_evaluations: judged.evaluations,
            phase_timings: ctx.phase_timing_map(),
            phase_status: ctx.phase_status_map(),
            metadata,
        };

        info!(
            run_id = %result.run_id,
            degraded = result.is_degraded(),
            quality = result.quality.score,
            judge_score = ?result.quality.judge_score,
            "pipeline run finished"
        );

        if let Some(sink) = ctx.history() {
            let record = run_record(&task, &ctx, &result, finished_at, judged.refinement_rounds);
            let handle = tokio::spawn(async move {
                if let Err(err) = sink.record(&record).await {
                    warn!(run_id = %record.run_id, error = %err, "failed to record run history");
                }
            });
            let mut pending = self
                .pending_history
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }

        let _ = event_tx
            .send(StageEvent::Completed {
                result: Box::new(result.clone()),
            })
            .await;
        Ok(result)
    }
}

/// Record a finished phase and emit its event.
async fn finish_phase(
    ctx: &mut OrchestrationContext,
    event_tx: &mpsc::Sender<StageEvent>,
    started: Instant,
    payload: StagePayload,
) {
    let phase = payload.phase();
    let elapsed = started.elapsed();
    ctx.record_timing(phase, elapsed);
    let status = ctx.status(phase).unwrap_or(PhaseStatus::Success);
    let elapsed_ms = millis(elapsed);

    info!(run_id = %ctx.run_id(), phase = %phase, status = %status, elapsed_ms, "phase completed");

    if event_tx
        .send(StageEvent::StageCompleted {
            phase,
            status,
            elapsed_ms,
            payload,
        })
        .await
        .is_err()
    {
        debug!(phase = %phase, "no event receiver");
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn run_record(
    task: &Task,
    ctx: &OrchestrationContext,
    result: &FinalResult,
    finished_at: chrono::DateTime<Utc>,
    refinement_rounds: u32,
) -> RunRecord {
    RunRecord {
        run_id: result.run_id,
        task: task.text().to_string(),
        correlation_id: task.correlation_id().map(str::to_string),
        conversation_id: task.conversation_id().map(str::to_string),
        started_at: ctx.started_at(),
        finished_at,
        mode: result.routing.decision.mode.to_string(),
        assigned_agents: result.routing.decision.assigned_to.clone(),
        quality_score: result.quality.score,
        judge_score: result.quality.judge_score,
        refinement_rounds,
        phase_status: result.phase_status.clone(),
        phase_timings: result.phase_timings.clone(),
        edge_cases: ctx.edge_cases().to_vec(),
        final_result: result.final_result.clone(),
    }
}
