//! Domain models for the orchestration pipeline.
//!
//! Every stage message is created by one stage, consumed by the next and
//! never mutated afterwards.

pub mod analysis;
pub mod config;
pub mod execution;
pub mod pipeline;
pub mod progress;
pub mod quality;
pub mod routing;
pub mod task;

pub use analysis::{AnalysisResult, Complexity, RawAnalysis, DEFAULT_CAPABILITY};
pub use config::{
    Config, HistoryConfig, JudgeConfig, LoggingConfig, PipelineConfig, QualityProfile,
    ReasoningBackend, ReasoningConfig, RetryConfig, WorkerEntry, WorkersConfig,
};
pub use execution::{ExecutionOutcome, ExecutionStatus, HandoffNote, WorkerOutput};
pub use pipeline::{
    FinalResult, JudgeTerminal, Phase, PhaseStatus, RunRecord, StageEvent, StagePayload,
};
pub use progress::{ProgressAction, ProgressReport, RawProgress};
pub use quality::{
    clamp_score, JudgeEvaluation, QualityReport, RawQuality, RefinementNeeded, MAX_SCORE,
    NEUTRAL_SCORE,
};
pub use routing::{
    prepare_subtasks, ExecutionMode, RawRouting, RoutingDecision, RoutingPlan,
    LOW_CONFIDENCE_THRESHOLD,
};
pub use task::Task;
