//! Run-scoped orchestration context.
//!
//! One context is created per pipeline run and passed by `&mut` to each stage.
//! The configuration, worker registry, analysis cache and history sink are
//! shared handles; phase timings, phase statuses and the edge-case log belong
//! to the run alone.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::models::{Config, Phase, PhaseStatus};
use crate::domain::ports::{ExecutionHistorySink, WorkerRegistry};
use crate::services::analysis_cache::AnalysisCache;

pub struct OrchestrationContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    config: Arc<Config>,
    registry: Arc<dyn WorkerRegistry>,
    cache: AnalysisCache,
    history: Option<Arc<dyn ExecutionHistorySink>>,
    phase_status: BTreeMap<Phase, PhaseStatus>,
    phase_timings: BTreeMap<Phase, Duration>,
    edge_cases: Vec<String>,
}

impl OrchestrationContext {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<dyn WorkerRegistry>,
        cache: AnalysisCache,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            config,
            registry,
            cache,
            history: None,
            phase_status: BTreeMap::new(),
            phase_timings: BTreeMap::new(),
            edge_cases: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Option<Arc<dyn ExecutionHistorySink>>) -> Self {
        self.history = history;
        self
    }

    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &dyn WorkerRegistry {
        self.registry.as_ref()
    }

    pub const fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    pub fn history(&self) -> Option<Arc<dyn ExecutionHistorySink>> {
        self.history.clone()
    }

    pub fn set_status(&mut self, phase: Phase, status: PhaseStatus) {
        self.phase_status.insert(phase, status);
    }

    pub fn status(&self, phase: Phase) -> Option<PhaseStatus> {
        self.phase_status.get(&phase).copied()
    }

    pub fn record_timing(&mut self, phase: Phase, elapsed: Duration) {
        self.phase_timings.insert(phase, elapsed);
    }

    pub fn timing(&self, phase: Phase) -> Option<Duration> {
        self.phase_timings.get(&phase).copied()
    }

    pub fn add_edge_cases(&mut self, cases: impl IntoIterator<Item = String>) {
        self.edge_cases.extend(cases);
    }

    pub fn edge_cases(&self) -> &[String] {
        &self.edge_cases
    }

    /// Phase statuses keyed by phase name.
    pub fn phase_status_map(&self) -> BTreeMap<String, PhaseStatus> {
        self.phase_status
            .iter()
            .map(|(phase, status)| (phase.as_str().to_string(), *status))
            .collect()
    }

    /// Phase timings in seconds keyed by phase name.
    pub fn phase_timing_map(&self) -> BTreeMap<String, f64> {
        self.phase_timings
            .iter()
            .map(|(phase, elapsed)| (phase.as_str().to_string(), elapsed.as_secs_f64()))
            .collect()
    }
}

impl std::fmt::Debug for OrchestrationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationContext")
            .field("run_id", &self.run_id)
            .field("phase_status", &self.phase_status)
            .field("edge_cases", &self.edge_cases)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::registry::StaticWorkerRegistry;

    #[test]
    fn test_phase_maps_use_phase_names() {
        let mut ctx = OrchestrationContext::new(
            Arc::new(Config::default()),
            Arc::new(StaticWorkerRegistry::default()),
            AnalysisCache::disabled(),
        );

        ctx.set_status(Phase::Analysis, PhaseStatus::Cached);
        ctx.record_timing(Phase::Analysis, Duration::from_millis(1500));
        ctx.add_edge_cases(vec!["parallel mode with single agent".to_string()]);

        assert_eq!(ctx.phase_status_map()["analysis"], PhaseStatus::Cached);
        assert!((ctx.phase_timing_map()["analysis"] - 1.5).abs() < f64::EPSILON);
        assert_eq!(ctx.edge_cases().len(), 1);
        assert_eq!(ctx.status(Phase::Routing), None);
    }
}
