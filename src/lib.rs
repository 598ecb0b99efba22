//! Maestro - Staged Multi-Agent Task Orchestrator
//!
//! Maestro pushes a task through six stages: analysis, routing, execution,
//! progress evaluation, quality assessment and a judge-gated refinement loop.
//! Reasoning and workers sit behind port traits, so every stage degrades to a
//! documented fallback instead of aborting the run.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): stage messages, port traits and the error taxonomy
//! - **Service Layer** (`services`): the stages and the pipeline driver
//! - **Adapters** (`adapters`): model backends, workers, registries and history sinks
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use maestro::adapters::{MockWorkerRuntime, ScriptedReasoningService, StaticWorkerRegistry};
//! use maestro::{Config, PipelineDriver, WorkerEntry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = StaticWorkerRegistry::new(vec![WorkerEntry::new("Writer", "Drafts prose")]);
//!     let driver = PipelineDriver::new(
//!         Config::default(),
//!         Arc::new(ScriptedReasoningService::new()),
//!         Arc::new(MockWorkerRuntime::echo()),
//!         Arc::new(registry),
//!     );
//!     let result = driver.run_pipeline("Draft a release note").await?;
//!     println!("{}", result.final_result);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, ExecutionMode, FinalResult, JudgeTerminal, Phase, PhaseStatus, StageEvent, Task,
    WorkerEntry,
};
pub use domain::ports::{ExecutionHistorySink, ReasoningService, WorkerRegistry, WorkerRuntime};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::PipelineDriver;
