//! Common test utilities for integration tests
//!
//! Builds pipeline drivers over the in-process mock collaborators.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use maestro::adapters::{MockWorkerRuntime, ScriptedReasoningService, StaticWorkerRegistry};
use maestro::{Config, PipelineDriver, WorkerEntry};

/// Registry with one entry per name, described as "<name> worker".
pub fn registry(workers: &[&str]) -> StaticWorkerRegistry {
    StaticWorkerRegistry::new(
        workers
            .iter()
            .map(|w| WorkerEntry::new(*w, format!("{w} worker")))
            .collect(),
    )
}

/// Default config with zero retry backoff so fallback paths run instantly.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.pipeline.retry.backoff_secs = 0.0;
    config.history.enabled = false;
    config
}

/// Config whose judge stage is gated by the worker named "Judge".
pub fn judged_config(max_rounds: u32) -> Config {
    let mut config = fast_config();
    config.judge.judge_agent = Some("Judge".into());
    config.judge.max_refinement_rounds = max_rounds;
    config
}

pub fn driver(
    config: Config,
    reasoning: Arc<ScriptedReasoningService>,
    runtime: Arc<MockWorkerRuntime>,
    workers: &[&str],
) -> PipelineDriver {
    PipelineDriver::new(config, reasoning, runtime, Arc::new(registry(workers)))
}

/// Adds a "Judge" worker that lists generic criteria and then scores verdicts
/// from `scores`, repeating the last score once the script runs out.
pub fn with_scripted_judge(runtime: MockWorkerRuntime, scores: &'static [f64]) -> MockWorkerRuntime {
    let verdicts = AtomicUsize::new(0);
    runtime.with_worker("Judge", move |prompt| {
        if prompt.starts_with("List 3 to 5") {
            return Ok("- accurate\n- complete\n- clear".into());
        }
        let n = verdicts.fetch_add(1, Ordering::SeqCst);
        let score = scores[n.min(scores.len() - 1)];
        Ok(format!(
            "**Score:** {score}/10\n\
             **Missing Elements:** supporting detail\n\
             **Refinement Agent:** Writer\n\
             **Refinement Needed:** Yes\n\
             **Required Improvements:** expand the second paragraph"
        ))
    })
}
