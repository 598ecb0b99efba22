//! Progress evaluation report.

use serde::{Deserialize, Serialize};

/// What the pipeline should do next according to the progress stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressAction {
    #[default]
    Continue,
    Refine,
    Complete,
    Escalate,
}

impl ProgressAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Refine => "refine",
            Self::Complete => "complete",
            Self::Escalate => "escalate",
        }
    }

    /// Parse an action label; anything outside the four known actions becomes `Continue`.
    pub fn coerce(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "refine" => Self::Refine,
            "complete" => Self::Complete,
            "escalate" => Self::Escalate,
            _ => Self::Continue,
        }
    }
}

/// Progress report for an execution result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub action: ProgressAction,
    pub feedback: String,
    pub used_fallback: bool,
}

impl ProgressReport {
    pub fn fallback() -> Self {
        Self {
            action: ProgressAction::Continue,
            feedback: String::new(),
            used_fallback: true,
        }
    }
}

/// Progress payload as returned by the reasoning service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProgress {
    #[serde(alias = "next_action")]
    pub action: String,
    pub feedback: String,
}

impl RawProgress {
    pub fn normalize(self) -> ProgressReport {
        ProgressReport {
            action: ProgressAction::coerce(&self.action),
            feedback: self.feedback,
            used_fallback: false,
        }
    }
}
