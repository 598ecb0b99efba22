//! Task analysis produced by the first pipeline stage.

use serde::{Deserialize, Serialize};

/// Capability assigned when the reasoning service names none.
pub const DEFAULT_CAPABILITY: &str = "general_reasoning";

/// Estimated task complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }

    /// Parse a free-form complexity label, defaulting to `Moderate`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "simple" | "trivial" | "low" | "easy" => Self::Simple,
            "complex" | "very_complex" | "very complex" | "high" | "hard" => Self::Complex,
            _ => Self::Moderate,
        }
    }

    /// Complexity estimated from word count alone.
    pub const fn from_word_count(words: usize) -> Self {
        if words > 150 {
            Self::Complex
        } else if words > 40 {
            Self::Moderate
        } else {
            Self::Simple
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured analysis of a task.
///
/// Invariants: `steps >= 1` and `capabilities` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub complexity: Complexity,
    pub capabilities: Vec<String>,
    pub tool_requirements: Vec<String>,
    pub steps: u32,
    pub search_context: String,
    pub needs_web_search: bool,
    pub search_query: String,
}

impl AnalysisResult {
    /// Deterministic analysis derived from the task's word count.
    pub fn heuristic(words: usize) -> Self {
        let steps = u32::try_from(words / 40 + 1).unwrap_or(u32::MAX).clamp(3, 6);
        Self {
            complexity: Complexity::from_word_count(words),
            capabilities: vec![DEFAULT_CAPABILITY.to_string()],
            tool_requirements: Vec::new(),
            steps,
            search_context: String::new(),
            needs_web_search: false,
            search_query: String::new(),
        }
    }

    /// Whether a best-effort search enrichment call should be made.
    pub fn wants_enrichment(&self) -> bool {
        self.needs_web_search
            && !self.search_query.trim().is_empty()
            && self.search_context.trim().is_empty()
    }
}

/// Analysis payload as returned by the reasoning service, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAnalysis {
    pub complexity: Option<String>,
    #[serde(alias = "required_capabilities")]
    pub capabilities: Vec<String>,
    #[serde(alias = "tools")]
    pub tool_requirements: Vec<String>,
    #[serde(alias = "estimated_steps")]
    pub steps: Option<i64>,
    pub search_context: Option<String>,
    pub needs_web_search: bool,
    pub search_query: Option<String>,
}

impl RawAnalysis {
    /// Normalize into an [`AnalysisResult`] that upholds its invariants.
    pub fn normalize(self) -> AnalysisResult {
        let capabilities: Vec<String> = self
            .capabilities
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        AnalysisResult {
            complexity: self
                .complexity
                .as_deref()
                .map_or(Complexity::Moderate, Complexity::parse_lenient),
            capabilities: if capabilities.is_empty() {
                vec![DEFAULT_CAPABILITY.to_string()]
            } else {
                capabilities
            },
            tool_requirements: self
                .tool_requirements
                .into_iter()
                .filter(|t| !t.trim().is_empty())
                .collect(),
            steps: self
                .steps
                .map_or(1, |s| u32::try_from(s.max(1)).unwrap_or(u32::MAX)),
            search_context: self.search_context.unwrap_or_default(),
            needs_web_search: self.needs_web_search,
            search_query: self.search_query.unwrap_or_default().trim().to_string(),
        }
    }
}
