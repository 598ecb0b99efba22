//! Reasoning service port - the decision engine behind the pipeline stages.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::errors::DomainResult;
use crate::domain::models::{RawAnalysis, RawProgress, RawQuality, RawRouting};

/// Converts task text into structured analysis, routing, progress and quality judgments.
///
/// Implementations may fail on any call; the pipeline wraps every call in the
/// retry policy and falls back deterministically when retries are exhausted.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Analyze a task. `perform_search` asks the service to fill in search context itself.
    async fn analyze_task(&self, task: &str, perform_search: bool) -> DomainResult<RawAnalysis>;

    /// Decide which workers handle the task and how.
    async fn route_task(
        &self,
        task: &str,
        workers: &BTreeMap<String, String>,
        search_context: &str,
    ) -> DomainResult<RawRouting>;

    /// Judge whether an execution result moves the task forward.
    async fn evaluate_progress(&self, task: &str, result: &str) -> DomainResult<RawProgress>;

    /// Score a result against the task.
    async fn assess_quality(&self, task: &str, result: &str) -> DomainResult<RawQuality>;

    /// Best-effort search enrichment for an analysis that asked for web search.
    ///
    /// The default returns no context.
    async fn search_context(&self, _query: &str) -> DomainResult<String> {
        Ok(String::new())
    }
}
