//! `maestro config`: inspect the merged configuration.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration as YAML
    Show,
    /// Check the configuration and report a summary
    Validate,
}

#[derive(Debug, Serialize)]
struct ConfigShowOutput {
    config: Config,
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config)
            .unwrap_or_else(|err| format!("Failed to render configuration: {err}"))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Serialize)]
struct ConfigValidateOutput {
    valid: bool,
    workers: usize,
    judge_agent: Option<String>,
    backend: String,
    history: Option<String>,
}

impl CommandOutput for ConfigValidateOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "{} Configuration is valid",
            console::style("✓").green()
        )];
        lines.push(format!("  workers:  {}", self.workers));
        lines.push(format!(
            "  judge:    {}",
            self.judge_agent.as_deref().unwrap_or("(none)")
        ));
        lines.push(format!("  backend:  {}", self.backend));
        lines.push(format!(
            "  history:  {}",
            self.history.as_deref().unwrap_or("disabled")
        ));
        lines.join("\n")
    }
}

/// `config` arrives already loaded and validated; invalid files fail before dispatch.
pub fn execute(command: &ConfigCommands, config: Config, json_mode: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => output(&ConfigShowOutput { config }, json_mode),
        ConfigCommands::Validate => {
            let backend = serde_json::to_value(config.reasoning.backend)?
                .as_str()
                .unwrap_or_default()
                .to_string();
            let out = ConfigValidateOutput {
                valid: true,
                workers: config.workers.registry.len(),
                judge_agent: config.judge.judge_agent.clone().filter(|_| config.judge.enabled),
                backend,
                history: config
                    .history
                    .enabled
                    .then(|| config.history.database_path.clone()),
            };
            output(&out, json_mode);
        }
    }
    Ok(())
}
