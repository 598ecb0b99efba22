//! Judge/refine stage: quality-gated refinement with a bounded round budget.
//!
//! ```text
//! Judging ──pass──────────────────────────────▶ Passed
//!    │ score < threshold, rounds < max
//!    ▼
//! Refining ──ok──▶ Judging
//!    │ refiner unknown or failed
//!    ▼
//! RefinerUnavailable (previous result kept)
//! ```
//!
//! With `max_refinement_rounds = R` the judge is called at most `R + 1` times
//! and refinement at most `R` times. Judge and refinement calls go straight to
//! the worker runtime and are never retried. A judging round that times out
//! ends the loop with the last successful verdict.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    JudgeConfig, JudgeEvaluation, JudgeTerminal, Phase, PhaseStatus, QualityReport, Task,
    WorkersConfig, MAX_SCORE,
};
use crate::domain::ports::{WorkerRegistry, WorkerRuntime};
use crate::services::context::OrchestrationContext;
use crate::services::judge_parser::parse_judge_response;

/// Checklist used when the judge cannot produce task-specific criteria.
pub const GENERIC_CRITERIA: [&str; 3] = [
    "Completeness: every part of the task is addressed",
    "Accuracy: claims are correct and supported",
    "Clarity: the answer is well organized and easy to follow",
];

const RESEARCH_GAP_KEYWORDS: &[&str] = &["citation", "source", "reference", "evidence"];
const DATA_GAP_KEYWORDS: &[&str] = &["calculation", "data", "number", "statistic", "figure"];

/// Output of the judge/refine stage.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeOutcome {
    /// Result after the last successful refinement.
    pub result: String,
    /// One verdict per judging round, oldest first.
    pub evaluations: Vec<JudgeEvaluation>,
    pub terminal: JudgeTerminal,
    /// Judged refinement rounds performed.
    pub refinement_rounds: u32,
    /// Whether the unjudged fallback refinement pass replaced the result.
    pub fallback_refined: bool,
    /// False when no judge was configured and the result passed ungated.
    pub gated: bool,
    /// Quality report with the judge's last score attached.
    pub quality: QualityReport,
}

/// Pick the refinement worker for a verdict.
///
/// A worker named by the judge wins when it is registered. Otherwise the
/// missing-elements text is matched against gap categories.
pub fn choose_refiner(
    named: Option<&str>,
    missing: &str,
    registry: &dyn WorkerRegistry,
    roles: &WorkersConfig,
) -> String {
    if let Some(named) = named {
        if let Some(worker) = registry
            .worker_names()
            .into_iter()
            .find(|w| w.eq_ignore_ascii_case(named.trim()))
        {
            return worker;
        }
    }

    let lowered = missing.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    if mentions(RESEARCH_GAP_KEYWORDS) {
        roles.research_worker.clone()
    } else if mentions(DATA_GAP_KEYWORDS) {
        roles.analysis_worker.clone()
    } else {
        // writing, structure and clarity gaps share the default
        roles.writing_worker.clone()
    }
}

fn criteria_prompt(task: &str) -> String {
    format!(
        "List 3 to 5 concrete criteria a high-quality answer to the following task must meet. \
         One criterion per line, no commentary.\n\nTask:\n{task}"
    )
}

fn judge_prompt(task: &str, criteria: &[String], result: &str) -> String {
    let criteria = criteria
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are judging a result produced for a task.\n\n\
         Task:\n{task}\n\n\
         Quality criteria:\n{criteria}\n\n\
         Result:\n{result}\n\n\
         Answer using exactly these labels:\n\
         Score: <0-10>\n\
         Missing elements: <what is missing>\n\
         Refinement agent: <worker best suited to fix it, or none>\n\
         Refinement needed: <yes|no>\n\
         Required improvements: <concrete changes>"
    )
}

fn refinement_prompt(task: &str, result: &str, missing: &str, improvements: &str) -> String {
    format!(
        "Improve the following result so that it fully satisfies the task. \
         Return the complete improved result only.\n\n\
         Task:\n{task}\n\n\
         Current result:\n{result}\n\n\
         Missing elements:\n{missing}\n\n\
         Required improvements:\n{improvements}"
    )
}

pub struct JudgeStage {
    runtime: Arc<dyn WorkerRuntime>,
}

impl JudgeStage {
    pub fn new(runtime: Arc<dyn WorkerRuntime>) -> Self {
        Self { runtime }
    }

    /// Gate a result behind the judge, refining it while it falls short.
    #[instrument(skip_all, fields(run_id = %ctx.run_id()))]
    pub async fn judge(
        &self,
        task: &Task,
        result: String,
        quality: QualityReport,
        ctx: &mut OrchestrationContext,
    ) -> JudgeOutcome {
        let config = ctx.config().judge.clone();
        let judge_agent = config
            .judge_agent
            .as_deref()
            .map(str::trim)
            .filter(|name| config.enabled && !name.is_empty())
            .map(str::to_string);

        let mut outcome = match judge_agent {
            Some(judge) => self.judge_loop(&judge, task, result, quality, &config, ctx).await,
            None => {
                debug!("no judge configured, result passes ungated");
                ctx.set_status(Phase::Judge, PhaseStatus::Success);
                let mut quality = quality;
                quality.judge_score = Some(MAX_SCORE);
                JudgeOutcome {
                    result,
                    evaluations: Vec::new(),
                    terminal: JudgeTerminal::Passed,
                    refinement_rounds: 0,
                    fallback_refined: false,
                    gated: false,
                    quality,
                }
            }
        };

        let judged = !outcome.evaluations.is_empty();
        if !judged && wants_fallback_refinement(&outcome.quality, &config) {
            self.fallback_refinement(task, &mut outcome, ctx).await;
        }

        info!(
            terminal = outcome.terminal.as_str(),
            rounds = outcome.refinement_rounds,
            evaluations = outcome.evaluations.len(),
            judge_score = ?outcome.quality.judge_score,
            fallback_refined = outcome.fallback_refined,
            "judge stage finished"
        );
        outcome
    }

    async fn judge_loop(
        &self,
        judge: &str,
        task: &Task,
        mut result: String,
        mut quality: QualityReport,
        config: &JudgeConfig,
        ctx: &mut OrchestrationContext,
    ) -> JudgeOutcome {
        let round_timeout = config.round_timeout_secs.map(Duration::from_secs);
        let criteria = self.build_criteria(judge, task, round_timeout).await;

        let mut evaluations: Vec<JudgeEvaluation> = Vec::new();
        let mut refinement_rounds = 0;
        let mut round = 1;

        let terminal = loop {
            let prompt = judge_prompt(task.text(), &criteria, &result);
            let verdict = match self.call(judge, &prompt, round_timeout).await {
                Ok(text) => parse_judge_response(round, &text, config.threshold),
                Err(err @ DomainError::WorkerTimeout { .. }) => {
                    warn!(round, error = %err, "judging round timed out, keeping last verdict");
                    break JudgeTerminal::RoundsExhausted;
                }
                Err(err) if evaluations.is_empty() => {
                    warn!(error = %err, "judge unavailable");
                    break JudgeTerminal::JudgeUnavailable;
                }
                Err(err) => {
                    warn!(round, error = %err, "judging round failed, keeping last verdict");
                    break JudgeTerminal::RoundsExhausted;
                }
            };

            info!(
                round,
                score = verdict.score,
                needed = ?verdict.refinement_needed,
                "judge verdict"
            );
            let passes = verdict.passes(config.threshold);
            let refiner = choose_refiner(
                verdict.refinement_agent.as_deref(),
                &verdict.missing_elements,
                ctx.registry(),
                &ctx.config().workers,
            );
            let prompt = refinement_prompt(
                task.text(),
                &result,
                &verdict.missing_elements,
                &verdict.required_improvements,
            );
            evaluations.push(verdict);

            if passes {
                break JudgeTerminal::Passed;
            }
            if refinement_rounds >= config.max_refinement_rounds {
                break JudgeTerminal::RoundsExhausted;
            }

            match self.refine(&refiner, &prompt, round_timeout, ctx.registry()).await {
                Ok(refined) => {
                    debug!(round, refiner = %refiner, chars = refined.len(), "result refined");
                    result = refined;
                    refinement_rounds += 1;
                    round += 1;
                }
                Err(err) => {
                    warn!(refiner = %refiner, error = %err, "refinement failed, keeping previous result");
                    break JudgeTerminal::RefinerUnavailable;
                }
            }
        };

        // No verdict at all means the result was never actually judged.
        let status = if evaluations.is_empty() {
            PhaseStatus::Fallback
        } else {
            PhaseStatus::Success
        };
        ctx.set_status(Phase::Judge, status);

        if let Some(last) = evaluations.last() {
            quality.judge_score = Some(last.score);
            quality.final_evaluation = Some(last.clone());
        }

        JudgeOutcome {
            result,
            evaluations,
            terminal,
            refinement_rounds,
            fallback_refined: false,
            gated: true,
            quality,
        }
    }

    /// Ask the judge for task-specific criteria, falling back to a generic checklist.
    async fn build_criteria(
        &self,
        judge: &str,
        task: &Task,
        round_timeout: Option<Duration>,
    ) -> Vec<String> {
        match self.call(judge, &criteria_prompt(task.text()), round_timeout).await {
            Ok(text) => {
                let criteria: Vec<String> = text
                    .lines()
                    .map(|l| l.trim().trim_start_matches(['-', '*', '•']).trim())
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                if criteria.is_empty() {
                    generic_criteria()
                } else {
                    criteria
                }
            }
            Err(err) => {
                debug!(error = %err, "criteria unavailable, using generic checklist");
                generic_criteria()
            }
        }
    }

    /// One unjudged refinement pass driven by the quality report.
    async fn fallback_refinement(
        &self,
        task: &Task,
        outcome: &mut JudgeOutcome,
        ctx: &OrchestrationContext,
    ) {
        let quality = &outcome.quality;
        let refiner = choose_refiner(None, &quality.missing, ctx.registry(), &ctx.config().workers);
        let prompt = refinement_prompt(
            task.text(),
            &outcome.result,
            &quality.missing,
            &quality.improvements,
        );
        let round_timeout = ctx.config().judge.round_timeout_secs.map(Duration::from_secs);

        match self.refine(&refiner, &prompt, round_timeout, ctx.registry()).await {
            Ok(refined) => {
                info!(refiner = %refiner, score = quality.score, "fallback refinement applied");
                outcome.result = refined;
                outcome.fallback_refined = true;
            }
            Err(err) => {
                warn!(refiner = %refiner, error = %err, "fallback refinement skipped");
            }
        }
    }

    async fn refine(
        &self,
        refiner: &str,
        prompt: &str,
        limit: Option<Duration>,
        registry: &dyn WorkerRegistry,
    ) -> DomainResult<String> {
        if !registry.contains(refiner) {
            return Err(DomainError::RefinementUnavailable(format!(
                "worker '{refiner}' is not registered"
            )));
        }
        self.call(refiner, prompt, limit)
            .await
            .map_err(|err| DomainError::RefinementUnavailable(err.to_string()))
    }

    async fn call(&self, worker: &str, prompt: &str, limit: Option<Duration>) -> DomainResult<String> {
        let call = self.runtime.run(worker, prompt);
        match limit {
            Some(limit) => timeout(limit, call).await.unwrap_or_else(|_| {
                Err(DomainError::WorkerTimeout {
                    worker: worker.to_string(),
                    timeout_secs: limit.as_secs(),
                })
            }),
            None => call.await,
        }
    }
}

/// The unjudged pass needs a real quality score below the refinement threshold
/// and something concrete to improve.
fn wants_fallback_refinement(quality: &QualityReport, config: &JudgeConfig) -> bool {
    config.enable_fallback_refinement
        && !quality.used_fallback
        && quality.score < config.refinement_threshold
        && !quality.improvements.trim().is_empty()
}

fn generic_criteria() -> Vec<String> {
    GENERIC_CRITERIA.iter().map(|c| (*c).to_string()).collect()
}
