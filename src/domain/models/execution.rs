//! Execution outcome and sequential handoff notes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::routing::ExecutionMode;

/// Overall status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Error,
}

/// Output of a single worker slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerOutput {
    pub worker: String,
    pub subtask: String,
    pub output: String,
    pub succeeded: bool,
}

impl WorkerOutput {
    pub fn success(worker: &str, subtask: &str, output: String) -> Self {
        Self {
            worker: worker.to_string(),
            subtask: subtask.to_string(),
            output,
            succeeded: true,
        }
    }

    /// A failed slot. The error annotation takes the place of the output.
    pub fn failure(worker: &str, subtask: &str, error: &str) -> Self {
        Self {
            worker: worker.to_string(),
            subtask: subtask.to_string(),
            output: format!("[error] {worker} failed: {error}"),
            succeeded: false,
        }
    }

    /// Section rendered into the combined result.
    pub fn render(&self) -> String {
        format!("## {}\n{}", self.worker, self.output.trim())
    }
}

/// Result of executing a routing plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub result: String,
    pub mode: ExecutionMode,
    pub assigned_agents: Vec<String>,
    pub subtasks: Vec<String>,
    pub status: ExecutionStatus,
    pub artifacts: BTreeMap<String, serde_json::Value>,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Build an outcome from per-worker slots, concatenated in slot order.
    ///
    /// The outcome is an error when there are no slots or every slot failed.
    pub fn from_slots(
        mode: ExecutionMode,
        assigned_agents: Vec<String>,
        subtasks: Vec<String>,
        slots: &[WorkerOutput],
    ) -> Self {
        let result = if slots.len() == 1 {
            slots[0].output.clone()
        } else {
            slots
                .iter()
                .map(WorkerOutput::render)
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        let failed: Vec<&str> = slots
            .iter()
            .filter(|s| !s.succeeded)
            .map(|s| s.worker.as_str())
            .collect();
        let status = if failed.len() == slots.len() {
            ExecutionStatus::Error
        } else {
            ExecutionStatus::Success
        };

        let mut artifacts = BTreeMap::new();
        artifacts.insert(
            "worker_outputs".to_string(),
            serde_json::to_value(slots).unwrap_or_default(),
        );
        artifacts.insert("failed_workers".to_string(), serde_json::json!(failed));

        Self {
            result,
            mode,
            assigned_agents,
            subtasks,
            status,
            artifacts,
        }
    }

    /// Outcome for an executor-level failure. The error text becomes the result.
    pub fn error(
        mode: ExecutionMode,
        assigned_agents: Vec<String>,
        subtasks: Vec<String>,
        error: &str,
    ) -> Self {
        let mut artifacts = BTreeMap::new();
        artifacts.insert("error".to_string(), serde_json::json!(error));
        Self {
            result: format!("Execution failed: {error}"),
            mode,
            assigned_agents,
            subtasks,
            status: ExecutionStatus::Error,
            artifacts,
        }
    }
}

/// Structured note passed from one sequential worker to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffNote {
    pub from: String,
    pub to: String,
    pub completed_subtask: String,
    pub summary: String,
}

/// Maximum characters of prior output carried in a handoff summary.
const HANDOFF_SUMMARY_CHARS: usize = 500;

impl HandoffNote {
    pub fn new(previous: &WorkerOutput, to: &str) -> Self {
        let summary: String = previous.output.chars().take(HANDOFF_SUMMARY_CHARS).collect();
        Self {
            from: previous.worker.clone(),
            to: to.to_string(),
            completed_subtask: previous.subtask.clone(),
            summary,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "HANDOFF NOTE\nFrom: {}\nTo: {}\nCompleted subtask: {}\nSummary: {}",
            self.from, self.to, self.completed_subtask, self.summary
        )
    }
}
