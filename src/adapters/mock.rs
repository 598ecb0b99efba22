//! In-process collaborators for tests and dry runs.
//!
//! [`ScriptedReasoningService`] answers every reasoning call from a fixed
//! script and counts calls per method. [`MockWorkerRuntime`] dispatches to
//! per-worker handlers, logs every prompt and can delay chosen workers.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{RawAnalysis, RawProgress, RawQuality, RawRouting};
use crate::domain::ports::{ReasoningService, WorkerRuntime};

/// Reasoning service answering from a script.
pub struct ScriptedReasoningService {
    analysis: RawAnalysis,
    routing: Option<RawRouting>,
    progress: RawProgress,
    quality: RawQuality,
    search: DomainResult<String>,
    failure: Option<DomainError>,
    method_failures: HashMap<&'static str, DomainError>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl Default for ScriptedReasoningService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedReasoningService {
    /// A service that analyzes everything as moderate, routes to the first
    /// listed worker, reports completion and scores 8.
    pub fn new() -> Self {
        Self {
            analysis: RawAnalysis {
                complexity: Some("moderate".into()),
                steps: Some(3),
                ..Default::default()
            },
            routing: None,
            progress: RawProgress {
                action: "complete".into(),
                feedback: String::new(),
            },
            quality: RawQuality {
                score: 8.0,
                missing: String::new(),
                improvements: String::new(),
            },
            search: Ok(String::new()),
            failure: None,
            method_failures: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_analysis(mut self, analysis: RawAnalysis) -> Self {
        self.analysis = analysis;
        self
    }

    pub fn with_routing(mut self, routing: RawRouting) -> Self {
        self.routing = Some(routing);
        self
    }

    pub fn with_progress(mut self, progress: RawProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_quality(mut self, quality: RawQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_search_result(mut self, context: impl Into<String>) -> Self {
        self.search = Ok(context.into());
        self
    }

    pub fn with_search_failure(mut self) -> Self {
        self.search = Err(DomainError::TransientReasoning("search unavailable".into()));
        self
    }

    /// Fail every call with `error`.
    pub fn failing_with(mut self, error: DomainError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Fail one method (`analyze_task`, `route_task`, `evaluate_progress`,
    /// `assess_quality` or `search_context`) with `error`.
    pub fn failing_method(mut self, method: &'static str, error: DomainError) -> Self {
        self.method_failures.insert(method, error);
        self
    }

    /// Number of calls made to `method`.
    pub fn calls(&self, method: &str) -> usize {
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.get(method).copied().unwrap_or(0)
    }

    fn enter(&self, method: &'static str) -> DomainResult<()> {
        {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            *calls.entry(method).or_insert(0) += 1;
        }
        match self.method_failures.get(method).or(self.failure.as_ref()) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoningService {
    async fn analyze_task(&self, _task: &str, _perform_search: bool) -> DomainResult<RawAnalysis> {
        self.enter("analyze_task")?;
        Ok(self.analysis.clone())
    }

    async fn route_task(
        &self,
        _task: &str,
        workers: &BTreeMap<String, String>,
        _search_context: &str,
    ) -> DomainResult<RawRouting> {
        self.enter("route_task")?;
        Ok(self.routing.clone().unwrap_or_else(|| RawRouting {
            assigned_to: workers.keys().take(1).cloned().collect(),
            mode: Some("delegated".into()),
            confidence: Some(0.9),
            ..Default::default()
        }))
    }

    async fn evaluate_progress(&self, _task: &str, _result: &str) -> DomainResult<RawProgress> {
        self.enter("evaluate_progress")?;
        Ok(self.progress.clone())
    }

    async fn assess_quality(&self, _task: &str, _result: &str) -> DomainResult<RawQuality> {
        self.enter("assess_quality")?;
        Ok(self.quality.clone())
    }

    async fn search_context(&self, _query: &str) -> DomainResult<String> {
        self.enter("search_context")?;
        self.search.clone()
    }
}

type Handler = Box<dyn Fn(&str) -> DomainResult<String> + Send + Sync>;

/// Worker runtime dispatching to in-process handlers.
pub struct MockWorkerRuntime {
    handlers: HashMap<String, Handler>,
    /// Worker -> (calls to let through undelayed, delay for the rest)
    delays: HashMap<String, (usize, Duration)>,
    echo: bool,
    log: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockWorkerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWorkerRuntime {
    /// A runtime with no handlers: every call fails as an unknown worker.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            delays: HashMap::new(),
            echo: false,
            log: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// A runtime where workers without a handler echo the first line of their prompt.
    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::new()
        }
    }

    pub fn with_worker<F>(mut self, worker: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str) -> DomainResult<String> + Send + Sync + 'static,
    {
        self.handlers.insert(worker.into(), Box::new(handler));
        self
    }

    /// Delay every call to `worker`.
    pub fn with_delay(self, worker: impl Into<String>, delay: Duration) -> Self {
        self.with_delay_after(worker, 0, delay)
    }

    /// Delay calls to `worker` after the first `undelayed` calls.
    pub fn with_delay_after(
        mut self,
        worker: impl Into<String>,
        undelayed: usize,
        delay: Duration,
    ) -> Self {
        self.delays.insert(worker.into(), (undelayed, delay));
        self
    }

    /// Prompts sent to `worker`, in call order.
    pub fn calls_for(&self, worker: &str) -> Vec<String> {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.iter()
            .filter(|(w, _)| w == worker)
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }

    /// Worker names in the order their calls started.
    pub fn call_order(&self) -> Vec<String> {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.iter().map(|(w, _)| w.clone()).collect()
    }

    pub fn total_calls(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Highest number of calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, worker: &str, prompt: &str) -> usize {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = log.iter().filter(|(w, _)| w == worker).count();
        log.push((worker.to_string(), prompt.to_string()));
        previous
    }

    fn respond(&self, worker: &str, prompt: &str) -> DomainResult<String> {
        match self.handlers.get(worker) {
            Some(handler) => handler(prompt),
            None if self.echo => Ok(format!(
                "[{worker}] {}",
                prompt.lines().next().unwrap_or_default()
            )),
            None => Err(DomainError::worker(worker, "unknown worker")),
        }
    }
}

#[async_trait]
impl WorkerRuntime for MockWorkerRuntime {
    async fn run(&self, worker: &str, prompt: &str) -> DomainResult<String> {
        let previous_calls = self.record(worker, prompt);

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        // Released on drop so a call cancelled mid-delay stops counting.
        let _guard = InFlightGuard(&self.in_flight);

        if let Some((undelayed, delay)) = self.delays.get(worker) {
            if previous_calls >= *undelayed {
                tokio::time::sleep(*delay).await;
            }
        }

        self.respond(worker, prompt)
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_default_routes_to_first_worker() {
        let service = ScriptedReasoningService::new();
        let workers = BTreeMap::from([
            ("Analyst".to_string(), String::new()),
            ("Writer".to_string(), String::new()),
        ]);

        let routing = service.route_task("t", &workers, "").await.unwrap();

        assert_eq!(routing.assigned_to, vec!["Analyst".to_string()]);
        assert_eq!(service.calls("route_task"), 1);
        assert_eq!(service.calls("analyze_task"), 0);
    }

    #[tokio::test]
    async fn test_method_failure_overrides_script() {
        let service = ScriptedReasoningService::new()
            .failing_method("assess_quality", DomainError::MalformedResponse("{".into()));

        assert!(service.assess_quality("t", "r").await.is_err());
        assert!(service.evaluate_progress("t", "r").await.is_ok());
    }

    #[tokio::test]
    async fn test_runtime_logs_and_echoes() {
        let runtime = MockWorkerRuntime::echo().with_worker("Math", |_| Ok("4".into()));

        assert_eq!(runtime.run("Math", "2+2").await.unwrap(), "4");
        assert_eq!(runtime.run("Writer", "draft\nmore").await.unwrap(), "[Writer] draft");
        assert_eq!(runtime.call_order(), vec!["Math", "Writer"]);
        assert_eq!(runtime.total_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_call_leaves_flight() {
        let runtime = MockWorkerRuntime::echo().with_delay("Slow", Duration::from_secs(5));

        let timed_out =
            tokio::time::timeout(Duration::from_secs(1), runtime.run("Slow", "late")).await;
        assert!(timed_out.is_err());

        runtime.run("Fast", "next").await.unwrap();
        assert_eq!(runtime.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_unknown_worker_fails_without_echo() {
        let runtime = MockWorkerRuntime::new();
        let err = runtime.run("Ghost", "boo").await.unwrap_err();
        assert!(matches!(err, DomainError::WorkerExecution { .. }));
    }
}
