//! Quality assessment and judge evaluations.

use serde::{Deserialize, Serialize};

/// Upper bound of every quality and judge score.
pub const MAX_SCORE: f64 = 10.0;

/// Neutral score used when a full assessment fails.
pub const NEUTRAL_SCORE: f64 = 5.0;

/// Clamp a score into `[0, 10]`, mapping NaN to zero.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, MAX_SCORE)
    }
}

/// Quality report for a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub score: f64,
    pub missing: String,
    pub improvements: String,
    pub judge_score: Option<f64>,
    pub final_evaluation: Option<JudgeEvaluation>,
    pub used_fallback: bool,
}

impl QualityReport {
    /// Report carrying only a fallback score.
    pub fn fallback(score: f64) -> Self {
        Self {
            score,
            missing: String::new(),
            improvements: String::new(),
            judge_score: None,
            final_evaluation: None,
            used_fallback: true,
        }
    }
}

/// Quality payload as returned by the reasoning service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawQuality {
    #[serde(alias = "quality_score")]
    pub score: f64,
    #[serde(alias = "missing_elements")]
    pub missing: String,
    #[serde(alias = "improvement_suggestions")]
    pub improvements: String,
}

impl RawQuality {
    pub fn normalize(self) -> QualityReport {
        QualityReport {
            score: clamp_score(self.score),
            missing: self.missing,
            improvements: self.improvements,
            judge_score: None,
            final_evaluation: None,
            used_fallback: false,
        }
    }
}

/// Whether the judge asked for another refinement round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementNeeded {
    Yes,
    #[default]
    No,
}

impl RefinementNeeded {
    pub fn parse_lenient(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        if value.starts_with("yes") || value == "true" || value == "y" {
            Some(Self::Yes)
        } else if value.starts_with("no") || value == "false" || value == "n" {
            Some(Self::No)
        } else {
            None
        }
    }
}

/// One judge verdict on the current result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeEvaluation {
    /// 1-based judging round.
    pub round: u32,
    pub score: f64,
    pub missing_elements: String,
    pub refinement_agent: Option<String>,
    pub refinement_needed: RefinementNeeded,
    pub required_improvements: String,
    pub raw_response: String,
}

impl JudgeEvaluation {
    /// Score is authoritative: below the threshold, refinement is needed
    /// whatever the judge stated.
    pub fn enforce_threshold(mut self, threshold: f64) -> Self {
        if self.score < threshold && self.refinement_needed == RefinementNeeded::No {
            self.refinement_needed = RefinementNeeded::Yes;
        }
        self
    }

    pub fn passes(&self, threshold: f64) -> bool {
        self.score >= threshold || self.refinement_needed == RefinementNeeded::No
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluation(score: f64, needed: RefinementNeeded) -> JudgeEvaluation {
        JudgeEvaluation {
            round: 1,
            score,
            missing_elements: String::new(),
            refinement_agent: None,
            refinement_needed: needed,
            required_improvements: String::new(),
            raw_response: String::new(),
        }
    }

    #[test]
    fn test_clamp_score() {
        assert!((clamp_score(12.0) - 10.0).abs() < f64::EPSILON);
        assert!(clamp_score(-1.0).abs() < f64::EPSILON);
        assert!(clamp_score(f64::NAN).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_overrides_stated_intent() {
        let eval = evaluation(4.0, RefinementNeeded::No).enforce_threshold(8.0);
        assert_eq!(eval.refinement_needed, RefinementNeeded::Yes);
        assert!(!eval.passes(8.0));

        let eval = evaluation(9.0, RefinementNeeded::No).enforce_threshold(8.0);
        assert_eq!(eval.refinement_needed, RefinementNeeded::No);
        assert!(eval.passes(8.0));
    }

    #[test]
    fn test_refinement_needed_parsing() {
        assert_eq!(RefinementNeeded::parse_lenient("Yes."), Some(RefinementNeeded::Yes));
        assert_eq!(RefinementNeeded::parse_lenient("no"), Some(RefinementNeeded::No));
        assert_eq!(RefinementNeeded::parse_lenient("maybe"), None);
    }
}
