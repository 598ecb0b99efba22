//! Routing stage: decides which workers act and in which execution mode.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    prepare_subtasks, AnalysisResult, ExecutionMode, Phase, PhaseStatus, RawRouting,
    RoutingDecision, RoutingPlan, Task,
};
use crate::domain::ports::ReasoningService;
use crate::services::context::OrchestrationContext;
use crate::services::retry::RetryPolicy;

/// Words marking a task as research-flavored.
const RESEARCH_KEYWORDS: &[&str] = &[
    "research",
    "search",
    "find",
    "look up",
    "investigate",
    "sources",
    "citation",
    "latest",
];

pub fn is_research_task(task: &str) -> bool {
    let lowered = task.to_lowercase();
    RESEARCH_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Normalize a raw routing payload against the available workers.
///
/// Unknown worker names are dropped together with their subtask. When nobody
/// valid remains, research-flavored tasks go to `research_worker` (if it is
/// registered) and everything else to the first available worker. Delegated
/// decisions keep only their first assignee. Subtasks are reshaped to one per
/// assignee.
///
/// Returns the decision and notes about what normalization changed.
pub fn normalize_decision(
    raw: RawRouting,
    task: &str,
    available: &[String],
    research_worker: &str,
) -> DomainResult<(RoutingDecision, Vec<String>)> {
    if available.is_empty() {
        return Err(DomainError::RoutingUnavailable);
    }

    let mut notes = Vec::new();
    let mut assigned = Vec::new();
    let mut subtasks = Vec::new();

    for (i, name) in raw.assigned_to.iter().enumerate() {
        let wanted = name.trim();
        match available.iter().find(|w| w.eq_ignore_ascii_case(wanted)) {
            Some(worker) => {
                assigned.push(worker.clone());
                subtasks.push(raw.subtasks.get(i).cloned().unwrap_or_default());
            }
            None => notes.push(format!("unknown agent '{wanted}' dropped")),
        }
    }

    if assigned.is_empty() {
        let research_available = available.iter().any(|w| w == research_worker);
        let worker = if research_available && is_research_task(task) {
            research_worker.to_string()
        } else {
            available[0].clone()
        };
        notes.push(format!("no valid agents assigned; routed to {worker}"));
        assigned.push(worker);
        subtasks.clear();
    }

    let mode = raw
        .mode
        .as_deref()
        .map_or(ExecutionMode::Delegated, ExecutionMode::parse_lenient);

    if mode == ExecutionMode::Delegated {
        assigned.truncate(1);
        subtasks = vec![task.to_string()];
    }

    let subtasks = prepare_subtasks(assigned.len(), &subtasks, task);
    let confidence = raw
        .confidence
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0));

    Ok((
        RoutingDecision {
            task: task.to_string(),
            assigned_to: assigned,
            mode,
            subtasks,
            tool_requirements: raw.tool_requirements,
            confidence,
        },
        notes,
    ))
}

/// Produces routing plans from the reasoning service.
pub struct RoutingStage {
    reasoning: Arc<dyn ReasoningService>,
    retry: RetryPolicy,
}

impl RoutingStage {
    pub fn new(reasoning: Arc<dyn ReasoningService>, retry: RetryPolicy) -> Self {
        Self { reasoning, retry }
    }

    /// Route a task.
    ///
    /// Fails only with [`DomainError::RoutingUnavailable`] when no workers are
    /// registered. A reasoning failure yields a delegated fallback to the first worker.
    #[instrument(skip_all, fields(run_id = %ctx.run_id()))]
    pub async fn route(
        &self,
        task: &Task,
        analysis: &AnalysisResult,
        ctx: &mut OrchestrationContext,
    ) -> DomainResult<RoutingPlan> {
        let workers = ctx.registry().list_workers();
        let names = ctx.registry().worker_names();
        if workers.is_empty() || names.is_empty() {
            ctx.set_status(Phase::Routing, PhaseStatus::Failed);
            return Err(DomainError::RoutingUnavailable);
        }

        let reasoning = &self.reasoning;
        let search_context = analysis.search_context.as_str();
        let raw = self
            .retry
            .execute("route_task", || {
                reasoning.route_task(task.text(), &workers, search_context)
            })
            .await;

        let plan = match raw {
            Ok(raw) => {
                let mut edge_cases = raw.detect_edge_cases();
                let research_worker = ctx.config().workers.research_worker.clone();
                let (decision, notes) =
                    normalize_decision(raw, task.text(), &names, &research_worker)?;
                edge_cases.extend(notes);
                ctx.set_status(Phase::Routing, PhaseStatus::Success);
                RoutingPlan {
                    decision,
                    edge_cases,
                    used_fallback: false,
                }
            }
            Err(err) => {
                warn!(error = %err, worker = %names[0], "routing failed, delegating to first worker");
                ctx.set_status(Phase::Routing, PhaseStatus::Fallback);
                RoutingPlan {
                    decision: RoutingDecision::fallback(task.text(), names[0].clone()),
                    edge_cases: vec![format!("routing fallback: {err}")],
                    used_fallback: true,
                }
            }
        };

        for case in &plan.edge_cases {
            warn!(edge_case = %case, "routing edge case");
        }
        ctx.add_edge_cases(plan.edge_cases.iter().cloned());

        info!(
            mode = %plan.decision.mode,
            agents = ?plan.decision.assigned_to,
            confidence = ?plan.decision.confidence,
            used_fallback = plan.used_fallback,
            "task routed"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::ScriptedReasoningService;
    use crate::adapters::registry::StaticWorkerRegistry;
    use crate::domain::models::{Config, WorkerEntry};
    use crate::services::analysis_cache::AnalysisCache;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn context(workers: &[&str]) -> OrchestrationContext {
        let registry = StaticWorkerRegistry::new(
            workers
                .iter()
                .map(|w| WorkerEntry::new(*w, format!("{w} worker")))
                .collect(),
        );
        OrchestrationContext::new(
            Arc::new(Config::default()),
            Arc::new(registry),
            AnalysisCache::disabled(),
        )
    }

    #[test]
    fn test_normalize_drops_unknown_agents_with_their_subtasks() {
        let raw = RawRouting {
            assigned_to: names(&["Ghost", "writer", "Analyst"]),
            mode: Some("sequential".into()),
            subtasks: names(&["haunt", "draft", "crunch"]),
            ..Default::default()
        };
        let (decision, notes) =
            normalize_decision(raw, "task", &names(&["Writer", "Analyst"]), "Researcher").unwrap();

        assert_eq!(decision.assigned_to, names(&["Writer", "Analyst"]));
        assert_eq!(decision.subtasks, names(&["draft", "crunch"]));
        assert_eq!(decision.mode, ExecutionMode::Sequential);
        assert_eq!(notes, vec!["unknown agent 'Ghost' dropped"]);
    }

    #[test]
    fn test_normalize_delegated_keeps_single_agent_with_full_task() {
        let raw = RawRouting {
            assigned_to: names(&["Writer", "Analyst"]),
            mode: Some("delegated".into()),
            subtasks: names(&["draft", "crunch"]),
            ..Default::default()
        };
        let (decision, _) =
            normalize_decision(raw, "full task", &names(&["Writer", "Analyst"]), "Researcher")
                .unwrap();

        assert_eq!(decision.assigned_to, names(&["Writer"]));
        assert_eq!(decision.subtasks, names(&["full task"]));
    }

    #[test]
    fn test_normalize_empty_assignment_research_fallback() {
        let available = names(&["Writer", "Researcher"]);

        let (decision, notes) = normalize_decision(
            RawRouting::default(),
            "Research the history of Rust",
            &available,
            "Researcher",
        )
        .unwrap();
        assert_eq!(decision.assigned_to, names(&["Researcher"]));
        assert_eq!(notes, vec!["no valid agents assigned; routed to Researcher"]);

        let (decision, _) =
            normalize_decision(RawRouting::default(), "Write a poem", &available, "Researcher")
                .unwrap();
        assert_eq!(decision.assigned_to, names(&["Writer"]));
    }

    #[test]
    fn test_normalize_unknown_mode_and_confidence_clamp() {
        let raw = RawRouting {
            assigned_to: names(&["Writer"]),
            mode: Some("hive-mind".into()),
            confidence: Some(3.5),
            ..Default::default()
        };
        let (decision, _) = normalize_decision(raw, "t", &names(&["Writer"]), "R").unwrap();
        assert_eq!(decision.mode, ExecutionMode::Delegated);
        assert_eq!(decision.confidence, Some(1.0));
    }

    #[test]
    fn test_normalize_without_workers_is_unavailable() {
        let result = normalize_decision(RawRouting::default(), "t", &[], "R");
        assert!(matches!(result, Err(DomainError::RoutingUnavailable)));
    }

    #[tokio::test]
    async fn test_route_with_empty_registry_raises() {
        let reasoning = Arc::new(ScriptedReasoningService::new());
        let stage = RoutingStage::new(reasoning.clone(), RetryPolicy::no_retry());
        let mut ctx = context(&[]);

        let result = stage
            .route(&Task::new("anything"), &AnalysisResult::heuristic(1), &mut ctx)
            .await;

        assert!(matches!(result, Err(DomainError::RoutingUnavailable)));
        assert_eq!(ctx.status(Phase::Routing), Some(PhaseStatus::Failed));
        assert_eq!(reasoning.calls("route_task"), 0);
    }

    #[tokio::test]
    async fn test_route_failure_falls_back_to_first_worker() {
        let reasoning = Arc::new(
            ScriptedReasoningService::new()
                .failing_with(DomainError::TransientReasoning("timeout".into())),
        );
        let stage = RoutingStage::new(reasoning, RetryPolicy::no_retry());
        let mut ctx = context(&["Math", "Writer"]);

        let plan = stage
            .route(&Task::new("What is 2+2?"), &AnalysisResult::heuristic(3), &mut ctx)
            .await
            .unwrap();

        assert!(plan.used_fallback);
        assert_eq!(plan.decision.assigned_to, names(&["Math"]));
        assert_eq!(plan.decision.mode, ExecutionMode::Delegated);
        assert_eq!(plan.decision.confidence, Some(0.0));
        assert_eq!(ctx.status(Phase::Routing), Some(PhaseStatus::Fallback));
    }

    #[tokio::test]
    async fn test_route_records_edge_cases() {
        let reasoning = Arc::new(ScriptedReasoningService::new().with_routing(RawRouting {
            assigned_to: names(&["Math"]),
            mode: Some("parallel".into()),
            confidence: Some(0.2),
            ..Default::default()
        }));
        let stage = RoutingStage::new(reasoning, RetryPolicy::no_retry());
        let mut ctx = context(&["Math"]);

        let plan = stage
            .route(&Task::new("Sum these"), &AnalysisResult::heuristic(2), &mut ctx)
            .await
            .unwrap();

        assert_eq!(plan.decision.mode, ExecutionMode::Parallel);
        assert_eq!(plan.decision.subtasks, names(&["Sum these"]));
        assert!(plan.edge_cases.contains(&"parallel mode with single agent".to_string()));
        assert_eq!(ctx.edge_cases().len(), plan.edge_cases.len());
    }
}
