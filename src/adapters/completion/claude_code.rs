//! Claude Code CLI completion backend.
//!
//! Spawns `claude --print --output-format text` once per completion, writes
//! the prompt to stdin and returns stdout.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ReasoningConfig;
use crate::domain::ports::CompletionBackend;

/// Claude Code CLI configuration.
#[derive(Debug, Clone)]
pub struct ClaudeCodeConfig {
    /// Path to the claude binary
    pub binary_path: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl ClaudeCodeConfig {
    pub fn from_reasoning(config: &ReasoningConfig) -> Self {
        Self {
            binary_path: config.claude_path.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

pub struct ClaudeCodeBackend {
    config: ClaudeCodeConfig,
}

impl ClaudeCodeBackend {
    pub const fn new(config: ClaudeCodeConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, system_prompt: &str) -> Vec<String> {
        let mut args = vec![
            "--print".to_string(),
            "--output-format".to_string(),
            "text".to_string(),
            "--model".to_string(),
            self.config.model.clone(),
        ];
        if !system_prompt.is_empty() {
            args.push("--append-system-prompt".to_string());
            args.push(system_prompt.to_string());
        }
        args
    }

    async fn run(&self, system_prompt: &str, prompt: &str) -> DomainResult<String> {
        let mut child = Command::new(&self.config.binary_path)
            .args(self.build_args(system_prompt))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::Config(format!("failed to spawn claude: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| DomainError::TransientReasoning(format!("failed to write prompt: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DomainError::TransientReasoning(format!("claude process failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DomainError::TransientReasoning(format!(
                "claude exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl CompletionBackend for ClaudeCodeBackend {
    fn name(&self) -> &'static str {
        "claude_code"
    }

    async fn complete(&self, system_prompt: &str, prompt: &str) -> DomainResult<String> {
        let limit = Duration::from_secs(self.config.timeout_secs);
        let text = timeout(limit, self.run(system_prompt, prompt))
            .await
            .map_err(|_| {
                DomainError::TransientReasoning(format!(
                    "claude timed out after {}s",
                    self.config.timeout_secs
                ))
            })??;
        debug!(chars = text.len(), "claude completion received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(binary_path: &str) -> ClaudeCodeBackend {
        ClaudeCodeBackend::new(ClaudeCodeConfig {
            binary_path: binary_path.into(),
            model: "sonnet".into(),
            timeout_secs: 5,
        })
    }

    #[test]
    fn test_build_args_appends_system_prompt() {
        let args = backend("claude").build_args("You are a writer");
        assert_eq!(args[..3], ["--print", "--output-format", "text"]);
        assert!(args.ends_with(&["--append-system-prompt".to_string(), "You are a writer".to_string()]));

        let args = backend("claude").build_args("");
        assert!(!args.contains(&"--append-system-prompt".to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_is_config_error() {
        let err = backend("/nonexistent/claude-binary")
            .complete("", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Config(_)));
    }
}
