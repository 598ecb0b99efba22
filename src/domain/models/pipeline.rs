//! Pipeline-level types: phases, stage events and the final result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::analysis::AnalysisResult;
use super::execution::ExecutionOutcome;
use super::progress::ProgressReport;
use super::quality::{JudgeEvaluation, QualityReport};
use super::routing::RoutingPlan;

/// The six pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Analysis,
    Routing,
    Execution,
    Progress,
    Quality,
    Judge,
}

impl Phase {
    pub const ALL: [Self; 6] = [
        Self::Analysis,
        Self::Routing,
        Self::Execution,
        Self::Progress,
        Self::Quality,
        Self::Judge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Routing => "routing",
            Self::Execution => "execution",
            Self::Progress => "progress",
            Self::Quality => "quality",
            Self::Judge => "judge",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a phase produced its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Success,
    Fallback,
    Cached,
    Failed,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fallback => "fallback",
            Self::Cached => "cached",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of the judge/refine loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeTerminal {
    /// The result met the threshold, or no judge gates the run.
    Passed,
    /// The round budget ran out, or a judging round timed out.
    RoundsExhausted,
    /// The refinement worker could not be used; the prior result was kept.
    RefinerUnavailable,
    /// The judge worker failed before producing any verdict.
    JudgeUnavailable,
}

impl JudgeTerminal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::RoundsExhausted => "rounds_exhausted",
            Self::RefinerUnavailable => "refiner_unavailable",
            Self::JudgeUnavailable => "judge_unavailable",
        }
    }
}

/// Stage output carried by a [`StageEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StagePayload {
    Analysis(AnalysisResult),
    Routing(RoutingPlan),
    Execution(ExecutionOutcome),
    Progress(ProgressReport),
    Quality(QualityReport),
    Judge {
        terminal: JudgeTerminal,
        evaluations: Vec<JudgeEvaluation>,
        refinement_rounds: u32,
    },
}

impl StagePayload {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Analysis(_) => Phase::Analysis,
            Self::Routing(_) => Phase::Routing,
            Self::Execution(_) => Phase::Execution,
            Self::Progress(_) => Phase::Progress,
            Self::Quality(_) => Phase::Quality,
            Self::Judge { .. } => Phase::Judge,
        }
    }
}

/// Event emitted by the streaming pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(clippy::large_enum_variant)]
pub enum StageEvent {
    /// A stage finished and produced its output.
    StageCompleted {
        phase: Phase,
        status: PhaseStatus,
        elapsed_ms: u64,
        payload: StagePayload,
    },
    /// Terminal event: the run produced a final result.
    Completed { result: Box<FinalResult> },
    /// Terminal event: the run was aborted.
    Failed { phase: Phase, error: String },
}

impl StageEvent {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Aggregate of every stage output for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub run_id: Uuid,
    pub task: String,
    pub final_result: String,
    pub analysis: AnalysisResult,
    pub routing: RoutingPlan,
    pub execution: ExecutionOutcome,
    pub progress: ProgressReport,
    pub quality: QualityReport,
    pub judge_evaluations: Vec<JudgeEvaluation>,
    pub phase_timings: BTreeMap<String, f64>,
    pub phase_status: BTreeMap<String, PhaseStatus>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl FinalResult {
    /// True when any phase had to fall back or failed.
    pub fn is_degraded(&self) -> bool {
        self.phase_status
            .values()
            .any(|s| matches!(s, PhaseStatus::Fallback | PhaseStatus::Failed))
    }

    pub fn status_of(&self, phase: Phase) -> Option<PhaseStatus> {
        self.phase_status.get(phase.as_str()).copied()
    }
}

/// Summary persisted to the execution history sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub task: String,
    pub correlation_id: Option<String>,
    pub conversation_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub mode: String,
    pub assigned_agents: Vec<String>,
    pub quality_score: f64,
    pub judge_score: Option<f64>,
    pub refinement_rounds: u32,
    pub phase_status: BTreeMap<String, PhaseStatus>,
    pub phase_timings: BTreeMap<String, f64>,
    pub edge_cases: Vec<String>,
    pub final_result: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        let mut phases = Phase::ALL.to_vec();
        phases.reverse();
        phases.sort();
        assert_eq!(phases, Phase::ALL.to_vec());
        assert_eq!(Phase::Judge.to_string(), "judge");
    }

    #[test]
    fn test_stage_event_serializes_tagged() {
        let event = StageEvent::Failed {
            phase: Phase::Routing,
            error: "no workers".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["phase"], "routing");
        assert!(event.is_terminal());
    }
}
