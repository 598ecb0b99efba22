//! LLM-backed reasoning service.
//!
//! Each operation prompts the completion backend for a single JSON object and
//! deserializes it into the matching raw payload. Responses wrapped in prose
//! or markdown fences are tolerated; anything else is a malformed response,
//! which the retry policy treats as transient.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{RawAnalysis, RawProgress, RawQuality, RawRouting};
use crate::domain::ports::{CompletionBackend, ReasoningService};

const SYSTEM_PROMPT: &str = "You are the planning engine of a multi-agent orchestrator. \
    Answer with a single JSON object and nothing else.";

/// Pull the JSON object out of a model response.
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .map_or(trimmed, str::trim);

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if end > start => &unfenced[start..=end],
        _ => unfenced,
    }
}

fn parse<T: DeserializeOwned>(operation: &str, response: &str) -> DomainResult<T> {
    serde_json::from_str(extract_json(response)).map_err(|e| {
        DomainError::MalformedResponse(format!("{operation}: {e}"))
    })
}

fn analysis_prompt(task: &str, perform_search: bool) -> String {
    let search = if perform_search {
        "Fill search_context with relevant background you know."
    } else {
        "Leave search_context empty."
    };
    format!(
        "Analyze this task.\n\nTask:\n{task}\n\n\
         Return JSON with keys: complexity (simple|moderate|complex), capabilities (list of strings), \
         tool_requirements (list of strings), steps (integer >= 1), search_context (string), \
         needs_web_search (bool), search_query (string). {search}"
    )
}

fn routing_prompt(task: &str, workers: &BTreeMap<String, String>, search_context: &str) -> String {
    let roster = workers
        .iter()
        .map(|(name, description)| format!("- {name}: {description}"))
        .collect::<Vec<_>>()
        .join("\n");
    let context = if search_context.is_empty() {
        String::new()
    } else {
        format!("\n\nBackground:\n{search_context}")
    };
    format!(
        "Assign this task to the available workers.\n\nTask:\n{task}\n\nWorkers:\n{roster}{context}\n\n\
         Return JSON with keys: assigned_to (ordered list of worker names), \
         mode (delegated|sequential|parallel), subtasks (one per assigned worker), \
         tool_requirements (list of strings), confidence (0.0-1.0). \
         Use delegated with exactly one worker when one worker suffices."
    )
}

/// Reasoning service that prompts a completion backend.
pub struct LlmReasoningService<B: ?Sized + CompletionBackend = dyn CompletionBackend> {
    backend: Arc<B>,
}

impl<B: ?Sized + CompletionBackend> LlmReasoningService<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    async fn ask<T: DeserializeOwned>(&self, operation: &str, prompt: &str) -> DomainResult<T> {
        let response = self.backend.complete(SYSTEM_PROMPT, prompt).await?;
        debug!(operation, backend = self.backend.name(), chars = response.len(), "reasoning response");
        parse(operation, &response)
    }
}

#[async_trait]
impl<B: ?Sized + CompletionBackend> ReasoningService for LlmReasoningService<B> {
    async fn analyze_task(&self, task: &str, perform_search: bool) -> DomainResult<RawAnalysis> {
        self.ask("analyze_task", &analysis_prompt(task, perform_search)).await
    }

    async fn route_task(
        &self,
        task: &str,
        workers: &BTreeMap<String, String>,
        search_context: &str,
    ) -> DomainResult<RawRouting> {
        self.ask("route_task", &routing_prompt(task, workers, search_context))
            .await
    }

    async fn evaluate_progress(&self, task: &str, result: &str) -> DomainResult<RawProgress> {
        let prompt = format!(
            "Decide how to proceed with this task given the current result.\n\n\
             Task:\n{task}\n\nResult:\n{result}\n\n\
             Return JSON with keys: action (continue|refine|complete|escalate), feedback (string)."
        );
        self.ask("evaluate_progress", &prompt).await
    }

    async fn assess_quality(&self, task: &str, result: &str) -> DomainResult<RawQuality> {
        let prompt = format!(
            "Score how well the result answers the task.\n\n\
             Task:\n{task}\n\nResult:\n{result}\n\n\
             Return JSON with keys: score (0-10), missing (string), improvements (string)."
        );
        self.ask("assess_quality", &prompt).await
    }

    async fn search_context(&self, query: &str) -> DomainResult<String> {
        let prompt = format!(
            "Summarize the most relevant, up-to-date facts you know about: {query}\n\
             Plain text, at most 10 bullet points."
        );
        self.backend.complete("", &prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CannedBackend {
        responses: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedBackend {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().rev().map(|s| (*s).to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn complete(&self, _system_prompt: &str, prompt: &str) -> DomainResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.responses.lock().unwrap().pop().unwrap_or_default())
        }
    }

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json(r#"{"a":1}"#), r#"{"a":1}"#);
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), r#"{"a":1}"#);
        assert_eq!(extract_json("Sure! Here it is: {\"a\":1} Hope that helps."), r#"{"a":1}"#);
        assert_eq!(extract_json("no json here"), "no json here");
    }

    #[tokio::test]
    async fn test_route_task_parses_aliases() {
        let backend = Arc::new(CannedBackend::new(&[
            r#"```json
{"agents": ["Writer", "Analyst"], "execution_mode": "parallel", "subtasks": ["a", "b"], "confidence": 0.8}
```"#,
        ]));
        let service = LlmReasoningService::new(backend.clone());
        let workers = BTreeMap::from([
            ("Writer".to_string(), "writes prose".to_string()),
            ("Analyst".to_string(), "crunches numbers".to_string()),
        ]);

        let routing = service.route_task("compare", &workers, "").await.unwrap();

        assert_eq!(routing.assigned_to, vec!["Writer", "Analyst"]);
        assert_eq!(routing.mode.as_deref(), Some("parallel"));
        assert!(backend.prompts.lock().unwrap()[0].contains("- Analyst: crunches numbers"));
    }

    #[tokio::test]
    async fn test_prose_response_is_malformed() {
        let service = LlmReasoningService::new(Arc::new(CannedBackend::new(&["I cannot help"])));
        let err = service.assess_quality("t", "r").await.unwrap_err();
        assert!(matches!(err, DomainError::MalformedResponse(_)));
        assert!(err.is_transient());
    }
}
