//! `maestro workers`: list the worker registry.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{Config, WorkerEntry};

#[derive(Debug, Serialize)]
struct WorkerListOutput {
    workers: Vec<WorkerEntry>,
    judge_agent: Option<String>,
}

impl CommandOutput for WorkerListOutput {
    fn to_human(&self) -> String {
        if self.workers.is_empty() {
            return "No workers registered. Add entries under workers.registry in .maestro/config.yaml."
                .to_string();
        }
        let mut rendered = format!(
            "{} {}:\n{}",
            console::style(self.workers.len()).bold(),
            if self.workers.len() == 1 { "worker" } else { "workers" },
            TableFormatter::new().format_workers(&self.workers)
        );
        if let Some(judge) = &self.judge_agent {
            rendered.push_str(&format!("\nJudge: {judge}"));
        }
        rendered
    }
}

pub fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let out = WorkerListOutput {
        workers: config.workers.registry.clone(),
        judge_agent: config.judge.judge_agent.clone(),
    };
    output(&out, json_mode);
    Ok(())
}
