//! Application services: the staged pipeline and its supporting pieces.

pub mod analysis_cache;
pub mod context;
pub mod judge_parser;
pub mod pipeline;
pub mod retry;
pub mod stages;

pub use analysis_cache::AnalysisCache;
pub use context::OrchestrationContext;
pub use judge_parser::parse_judge_response;
pub use pipeline::PipelineDriver;
pub use retry::RetryPolicy;
