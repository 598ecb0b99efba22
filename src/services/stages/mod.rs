//! The six pipeline stages.
//!
//! Every stage except routing-without-workers returns a usable payload and
//! records its [`PhaseStatus`](crate::domain::models::PhaseStatus) on the run context.

pub mod analysis;
pub mod execution;
pub mod judge;
pub mod progress;
pub mod quality;
pub mod routing;

pub use analysis::AnalysisStage;
pub use execution::ExecutionDispatcher;
pub use judge::{choose_refiner, JudgeOutcome, JudgeStage, GENERIC_CRITERIA};
pub use progress::ProgressStage;
pub use quality::QualityStage;
pub use routing::{is_research_task, normalize_decision, RoutingStage};
