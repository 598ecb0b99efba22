//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - ReasoningService: analysis, routing, progress and quality judgments
//! - WorkerRuntime / WorkerRegistry: named workers and their execution
//! - ExecutionHistorySink: persistence of completed runs
//! - CompletionBackend: raw text generation behind the LLM adapters

pub mod completion;
pub mod history;
pub mod reasoning;
pub mod worker;

pub use completion::CompletionBackend;
pub use history::ExecutionHistorySink;
pub use reasoning::ReasoningService;
pub use worker::{WorkerRegistry, WorkerRuntime};
