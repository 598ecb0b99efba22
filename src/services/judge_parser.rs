//! Parser for free-text judge verdicts.
//!
//! The judge worker answers in labeled lines:
//!
//! ```text
//! Score: 6.5/10
//! Missing elements: no sources cited
//! Refinement agent: Researcher
//! Refinement needed: yes
//! Required improvements:
//! - add two citations
//! ```
//!
//! Labels are matched case-insensitively and may carry markdown bullets or
//! bold markers. Unlabeled lines following a label continue its value. A field
//! that never appears keeps its default: score 0, empty text, no agent,
//! refinement not needed. The score threshold is applied afterwards, so a
//! missing score always asks for refinement when judging is gated.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::models::{clamp_score, JudgeEvaluation, RefinementNeeded};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Score,
    MissingElements,
    RefinementAgent,
    RefinementNeeded,
    RequiredImprovements,
}

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "score" => Some(Self::Score),
            "missing elements" => Some(Self::MissingElements),
            "refinement agent" => Some(Self::RefinementAgent),
            "refinement needed" => Some(Self::RefinementNeeded),
            "required improvements" => Some(Self::RequiredImprovements),
            _ => None,
        }
    }
}

fn label_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)^[\s>*#-]*\**\s*(score|missing elements|refinement agent|refinement needed|required improvements)\s*\**\s*:\s*\**(.*)$",
            )
            .ok()
        })
        .as_ref()
}

fn number_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").ok())
        .as_ref()
}

/// Split a response into labeled field values.
fn collect_fields(response: &str) -> Vec<(Field, String)> {
    let Some(labels) = label_pattern() else {
        return Vec::new();
    };

    let mut fields: Vec<(Field, String)> = Vec::new();
    for line in response.lines() {
        if let Some(caps) = labels.captures(line) {
            let field = caps.get(1).and_then(|m| Field::from_label(m.as_str()));
            if let Some(field) = field {
                let value = caps.get(2).map_or("", |m| m.as_str());
                fields.push((field, clean(value)));
                continue;
            }
        }

        // Continuation of the previous field
        if let Some((_, value)) = fields.last_mut() {
            let extra = line.trim();
            if !extra.is_empty() {
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(extra);
            }
        }
    }
    fields
}

fn clean(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c| c == '*' || c == '"' || c == '`')
        .trim()
        .to_string()
}

fn parse_score(value: &str) -> Option<f64> {
    let m = number_pattern()?.find(value)?;
    m.as_str().parse::<f64>().ok().map(clamp_score)
}

fn parse_agent(value: &str) -> Option<String> {
    let name = value
        .split(|c: char| c == '(' || c == ',' || c == '\n')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_end_matches('.')
        .trim();
    match name.to_lowercase().as_str() {
        "" | "none" | "n/a" | "na" | "-" => None,
        _ => Some(name.to_string()),
    }
}

/// Parse one judge response into an evaluation, then apply the score threshold.
pub fn parse_judge_response(round: u32, response: &str, threshold: f64) -> JudgeEvaluation {
    let mut evaluation = JudgeEvaluation {
        round,
        score: 0.0,
        missing_elements: String::new(),
        refinement_agent: None,
        refinement_needed: RefinementNeeded::No,
        required_improvements: String::new(),
        raw_response: response.to_string(),
    };

    for (field, value) in collect_fields(response) {
        match field {
            Field::Score => {
                if let Some(score) = parse_score(&value) {
                    evaluation.score = score;
                }
            }
            Field::MissingElements => evaluation.missing_elements = value,
            Field::RefinementAgent => evaluation.refinement_agent = parse_agent(&value),
            Field::RefinementNeeded => {
                if let Some(needed) = RefinementNeeded::parse_lenient(&value) {
                    evaluation.refinement_needed = needed;
                }
            }
            Field::RequiredImprovements => evaluation.required_improvements = value,
        }
    }

    evaluation.enforce_threshold(threshold)
}
