//! Routing decisions: which workers act on a task and how.

use serde::{Deserialize, Serialize};

/// Confidence below which a routing decision is flagged as an edge case.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// How the assigned workers are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// A single worker runs once with the full task text.
    #[default]
    Delegated,
    /// Workers run one after another in list order.
    Sequential,
    /// Workers run concurrently, one call per (worker, subtask) pair.
    Parallel,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delegated => "delegated",
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }

    /// Parse a mode label. Anything unrecognized clamps to `Delegated`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "sequential" | "sequence" | "chain" | "pipeline" => Self::Sequential,
            "parallel" | "concurrent" | "fan_out" => Self::Parallel,
            _ => Self::Delegated,
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized routing decision.
///
/// Invariants: `assigned_to` is non-empty, `Delegated` implies exactly one
/// assignee, and `subtasks.len() == assigned_to.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub task: String,
    pub assigned_to: Vec<String>,
    pub mode: ExecutionMode,
    pub subtasks: Vec<String>,
    pub tool_requirements: Vec<String>,
    pub confidence: Option<f64>,
}

impl RoutingDecision {
    /// Decision used when the reasoning service cannot be reached.
    pub fn fallback(task: impl Into<String>, worker: impl Into<String>) -> Self {
        let task = task.into();
        Self {
            subtasks: vec![task.clone()],
            task,
            assigned_to: vec![worker.into()],
            mode: ExecutionMode::Delegated,
            tool_requirements: Vec::new(),
            confidence: Some(0.0),
        }
    }
}

/// A routing decision plus what was noticed while producing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingPlan {
    pub decision: RoutingDecision,
    pub edge_cases: Vec<String>,
    pub used_fallback: bool,
}

/// Routing payload as returned by the reasoning service, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRouting {
    #[serde(alias = "agents", alias = "assigned_agents")]
    pub assigned_to: Vec<String>,
    #[serde(alias = "execution_mode")]
    pub mode: Option<String>,
    pub subtasks: Vec<String>,
    pub tool_requirements: Vec<String>,
    pub confidence: Option<f64>,
}

impl RawRouting {
    /// Anomalies worth recording. Informational only: detection never changes the decision.
    pub fn detect_edge_cases(&self) -> Vec<String> {
        let mode = self
            .mode
            .as_deref()
            .map_or(ExecutionMode::Delegated, ExecutionMode::parse_lenient);
        let mut edge_cases = Vec::new();

        if let Some(confidence) = self.confidence {
            if confidence < LOW_CONFIDENCE_THRESHOLD {
                edge_cases.push(format!("low routing confidence ({confidence:.2})"));
            }
        }
        match mode {
            ExecutionMode::Parallel if self.assigned_to.len() == 1 => {
                edge_cases.push("parallel mode with single agent".to_string());
            }
            ExecutionMode::Delegated if self.assigned_to.len() > 1 => {
                edge_cases.push(format!(
                    "delegated mode with {} agents",
                    self.assigned_to.len()
                ));
            }
            _ => {}
        }
        if mode == ExecutionMode::Parallel && self.subtasks.is_empty() {
            edge_cases.push("parallel mode with zero subtasks".to_string());
        }

        edge_cases
    }
}

/// Reshape `subtasks` so there is exactly one per assignee.
///
/// Missing entries are padded with `fallback`; extra entries are dropped.
/// Blank subtasks are replaced with `fallback` as well.
pub fn prepare_subtasks(assignees: usize, subtasks: &[String], fallback: &str) -> Vec<String> {
    (0..assignees)
        .map(|i| match subtasks.get(i) {
            Some(s) if !s.trim().is_empty() => s.clone(),
            _ => fallback.to_string(),
        })
        .collect()
}
