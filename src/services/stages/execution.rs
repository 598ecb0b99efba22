//! Execution dispatcher: runs a routing plan against the worker runtime.
//!
//! Three strategies, selected strictly by the plan's mode:
//! - **Delegated**: one worker, once, with the full task text
//! - **Sequential**: workers in list order, optionally handing off prior output
//! - **Parallel**: one concurrent call per (worker, subtask) pair, joined in order
//!
//! Subtasks are reshaped to one per assigned worker before any call is made,
//! padding with the task text, so no assignee is ever skipped.
//!
//! Worker failures never abort execution. Each call runs on its own tokio task
//! so a panicking worker is contained to its slot.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    prepare_subtasks, ExecutionMode, ExecutionOutcome, HandoffNote, Phase, PhaseStatus,
    RoutingPlan, Task, WorkerOutput,
};
use crate::domain::ports::WorkerRuntime;
use crate::services::context::OrchestrationContext;

/// Dispatches routing plans to workers.
pub struct ExecutionDispatcher {
    runtime: Arc<dyn WorkerRuntime>,
}

impl ExecutionDispatcher {
    pub fn new(runtime: Arc<dyn WorkerRuntime>) -> Self {
        Self { runtime }
    }

    /// Execute a plan. Always returns an outcome; failures become `status = error`.
    #[instrument(skip_all, fields(run_id = %ctx.run_id(), mode = %plan.decision.mode))]
    pub async fn execute(
        &self,
        plan: &RoutingPlan,
        task: &Task,
        ctx: &mut OrchestrationContext,
    ) -> ExecutionOutcome {
        let decision = &plan.decision;
        let pipeline = &ctx.config().pipeline;
        let worker_timeout = pipeline.worker_timeout_secs.map(Duration::from_secs);
        let handoffs = pipeline.enable_handoffs;

        let outcome = if decision.assigned_to.is_empty() {
            ExecutionOutcome::error(
                decision.mode,
                Vec::new(),
                Vec::new(),
                "routing plan has no assigned workers",
            )
        } else {
            let workers = &decision.assigned_to;
            let subtasks = prepare_subtasks(workers.len(), &decision.subtasks, task.text());
            match decision.mode {
                ExecutionMode::Delegated => {
                    self.run_delegated(&workers[0], task, worker_timeout).await
                }
                ExecutionMode::Sequential => {
                    self.run_sequential(workers, subtasks, handoffs, worker_timeout)
                        .await
                }
                ExecutionMode::Parallel => {
                    self.run_parallel(workers, subtasks, worker_timeout).await
                }
            }
        };

        let status = if outcome.is_success() {
            PhaseStatus::Success
        } else {
            PhaseStatus::Failed
        };
        ctx.set_status(Phase::Execution, status);
        info!(
            status = %status,
            agents = ?outcome.assigned_agents,
            chars = outcome.result.len(),
            "execution finished"
        );
        outcome
    }

    async fn run_delegated(
        &self,
        worker: &str,
        task: &Task,
        worker_timeout: Option<Duration>,
    ) -> ExecutionOutcome {
        let slot = match self.run_slot(worker, task.text(), worker_timeout).await {
            Ok(output) => WorkerOutput::success(worker, task.text(), output),
            Err(err) => {
                warn!(worker = %worker, error = %err, "delegated worker failed");
                WorkerOutput::failure(worker, task.text(), &err.to_string())
            }
        };

        ExecutionOutcome::from_slots(
            ExecutionMode::Delegated,
            vec![worker.to_string()],
            vec![task.text().to_string()],
            &[slot],
        )
    }

    async fn run_sequential(
        &self,
        workers: &[String],
        subtasks: Vec<String>,
        handoffs: bool,
        worker_timeout: Option<Duration>,
    ) -> ExecutionOutcome {
        let mut slots: Vec<WorkerOutput> = Vec::with_capacity(workers.len());

        for (worker, subtask) in workers.iter().zip(&subtasks) {
            let prompt = match slots.last() {
                Some(previous) if handoffs => sequential_prompt(subtask, previous, worker),
                _ => subtask.clone(),
            };

            let slot = match self.run_slot(worker, &prompt, worker_timeout).await {
                Ok(output) => WorkerOutput::success(worker, subtask, output),
                Err(err) => {
                    warn!(worker = %worker, error = %err, "sequential worker failed, continuing");
                    WorkerOutput::failure(worker, subtask, &err.to_string())
                }
            };
            debug!(worker = %worker, succeeded = slot.succeeded, "sequential step done");
            slots.push(slot);
        }

        ExecutionOutcome::from_slots(
            ExecutionMode::Sequential,
            workers.to_vec(),
            subtasks,
            &slots,
        )
    }

    async fn run_parallel(
        &self,
        workers: &[String],
        subtasks: Vec<String>,
        worker_timeout: Option<Duration>,
    ) -> ExecutionOutcome {
        let calls = workers
            .iter()
            .zip(&subtasks)
            .map(|(worker, subtask)| async move {
                match self.run_slot(worker, subtask, worker_timeout).await {
                    Ok(output) => WorkerOutput::success(worker, subtask, output),
                    Err(err) => {
                        warn!(worker = %worker, error = %err, "parallel worker failed");
                        WorkerOutput::failure(worker, subtask, &err.to_string())
                    }
                }
            });

        // join_all yields results in input order regardless of completion order
        let slots = join_all(calls).await;

        ExecutionOutcome::from_slots(
            ExecutionMode::Parallel,
            workers.to_vec(),
            subtasks,
            &slots,
        )
    }

    /// Run one worker call on its own task, with an optional timeout.
    async fn run_slot(
        &self,
        worker: &str,
        prompt: &str,
        worker_timeout: Option<Duration>,
    ) -> DomainResult<String> {
        let runtime = Arc::clone(&self.runtime);
        let worker_name = worker.to_string();
        let prompt = prompt.to_string();

        let handle = tokio::spawn(async move {
            let call = runtime.run(&worker_name, &prompt);
            match worker_timeout {
                Some(limit) => timeout(limit, call).await.unwrap_or_else(|_| {
                    Err(DomainError::WorkerTimeout {
                        worker: worker_name.clone(),
                        timeout_secs: limit.as_secs(),
                    })
                }),
                None => call.await,
            }
        });

        handle
            .await
            .unwrap_or_else(|join_err| Err(DomainError::worker(worker, join_err.to_string())))
    }
}

/// Prompt for a sequential worker that receives a handoff from its predecessor.
fn sequential_prompt(subtask: &str, previous: &WorkerOutput, worker: &str) -> String {
    let note = HandoffNote::new(previous, worker);
    format!(
        "{subtask}\n\n{}\n\nPrevious output:\n{}",
        note.render(),
        previous.output
    )
}
