//! `maestro run`: push one task through the pipeline.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use serde::Serialize;
use std::sync::Arc;

use crate::adapters::{
    create_backend, LlmReasoningService, LlmWorkerRuntime, MockWorkerRuntime,
    ScriptedReasoningService, SqliteHistorySink, StaticWorkerRegistry, TracingHistorySink,
};
use crate::cli::output::{output, truncate, CommandOutput, TableFormatter};
use crate::domain::models::{
    Config, FinalResult, PhaseStatus, StageEvent, StagePayload, Task, WorkerEntry,
};
use crate::domain::ports::ExecutionHistorySink;
use crate::services::PipelineDriver;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Task text
    pub task: String,

    /// Print each stage as it finishes
    #[arg(long)]
    pub stream: bool,

    /// Use scripted reasoning and echoing workers instead of a model backend
    #[arg(long)]
    pub dry_run: bool,

    /// Correlation id recorded with the run
    #[arg(long)]
    pub correlation_id: Option<String>,

    /// Conversation id recorded with the run
    #[arg(long)]
    pub conversation_id: Option<String>,
}

impl RunArgs {
    fn to_task(&self) -> Task {
        let mut task = Task::new(self.task.clone());
        if let Some(id) = &self.correlation_id {
            task = task.with_correlation_id(id.clone());
        }
        if let Some(id) = &self.conversation_id {
            task = task.with_conversation_id(id.clone());
        }
        task
    }
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    #[serde(flatten)]
    pub result: FinalResult,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let result = &self.result;
        let mut lines = vec![
            format!(
                "{} {}",
                style("Run").bold(),
                style(result.run_id.to_string()).dim()
            ),
            TableFormatter::new().format_phases(result),
        ];

        if result.is_degraded() {
            lines.push(
                style("Some phases fell back to defaults; see the status column.")
                    .yellow()
                    .to_string(),
            );
        }

        lines.push(String::new());
        lines.push(style("Result").bold().underlined().to_string());
        lines.push(result.final_result.clone());
        lines.join("\n")
    }
}

pub async fn execute(args: RunArgs, config: Config, json_mode: bool) -> Result<()> {
    let task = args.to_task();
    let driver = build_driver(config, args.dry_run).await?;

    if args.stream {
        stream(&driver, task, json_mode).await?;
    } else {
        let result = driver.run_pipeline(task).await?;
        output(&RunOutput { result }, json_mode);
    }

    driver.flush_history().await;
    Ok(())
}

async fn stream(driver: &PipelineDriver, task: Task, json_mode: bool) -> Result<()> {
    let mut events = driver.stream_pipeline(task);

    while let Some(event) = events.recv().await {
        if json_mode {
            println!("{}", serde_json::to_string(&event)?);
        }
        match event {
            StageEvent::StageCompleted {
                phase,
                status,
                elapsed_ms,
                payload,
            } => {
                if !json_mode {
                    println!(
                        "{} {:<10} {:<8} {:>6}ms  {}",
                        status_marker(status),
                        phase.as_str(),
                        status.as_str(),
                        elapsed_ms,
                        style(payload_summary(&payload)).dim()
                    );
                }
            }
            StageEvent::Completed { result } => {
                if !json_mode {
                    println!();
                    println!("{}", result.final_result);
                }
                return Ok(());
            }
            StageEvent::Failed { phase, error } => {
                anyhow::bail!("Run aborted during {phase}: {error}");
            }
        }
    }

    anyhow::bail!("Pipeline stopped without a terminal event")
}

fn status_marker(status: PhaseStatus) -> console::StyledObject<&'static str> {
    match status {
        PhaseStatus::Success => style("✓").green(),
        PhaseStatus::Cached => style("◆").cyan(),
        PhaseStatus::Fallback => style("~").yellow(),
        PhaseStatus::Failed => style("✗").red(),
    }
}

fn payload_summary(payload: &StagePayload) -> String {
    match payload {
        StagePayload::Analysis(analysis) => {
            format!("{} complexity, {} steps", analysis.complexity, analysis.steps)
        }
        StagePayload::Routing(plan) => format!(
            "{} → {}",
            plan.decision.mode,
            plan.decision.assigned_to.join(", ")
        ),
        StagePayload::Execution(outcome) => truncate(outcome.result.lines().next().unwrap_or(""), 60),
        StagePayload::Progress(report) => report.action.as_str().to_string(),
        StagePayload::Quality(report) => format!("score {:.1}", report.score),
        StagePayload::Judge {
            terminal,
            refinement_rounds,
            ..
        } => format!("{}, {refinement_rounds} refinements", terminal.as_str()),
    }
}

/// Wire the driver from configuration.
///
/// Dry runs answer every reasoning call from a script and echo worker prompts,
/// so they need neither a model backend nor configured workers.
pub async fn build_driver(config: Config, dry_run: bool) -> Result<PipelineDriver> {
    let history = history_sink(&config).await?;

    let driver = if dry_run {
        let mut entries = config.workers.registry.clone();
        if entries.is_empty() {
            entries = vec![
                WorkerEntry::new(&config.workers.research_worker, "Finds and cites sources"),
                WorkerEntry::new(&config.workers.analysis_worker, "Works through data"),
                WorkerEntry::new(&config.workers.writing_worker, "Drafts and edits prose"),
            ];
        }
        PipelineDriver::new(
            config,
            Arc::new(ScriptedReasoningService::new()),
            Arc::new(MockWorkerRuntime::echo()),
            Arc::new(StaticWorkerRegistry::new(entries)),
        )
    } else {
        let backend = create_backend(&config.reasoning)
            .context("Failed to create reasoning backend")?;
        let registry = Arc::new(StaticWorkerRegistry::from_config(&config.workers));
        PipelineDriver::new(
            config,
            Arc::new(LlmReasoningService::new(Arc::clone(&backend))),
            Arc::new(LlmWorkerRuntime::new(backend, Arc::clone(&registry))),
            registry,
        )
    };

    Ok(driver.with_history(history))
}

async fn history_sink(config: &Config) -> Result<Arc<dyn ExecutionHistorySink>> {
    if !config.history.enabled {
        return Ok(Arc::new(TracingHistorySink));
    }
    let sink = SqliteHistorySink::connect(&config.history.database_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open history database at {}",
                config.history.database_path
            )
        })?;
    Ok(Arc::new(sink))
}
