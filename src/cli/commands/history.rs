//! `maestro history`: recent runs from the SQLite history.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::adapters::SqliteHistorySink;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{Config, RunRecord};

#[derive(Debug, Serialize)]
struct HistoryOutput {
    runs: Vec<RunRecord>,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        if self.runs.is_empty() {
            return "No runs recorded.".to_string();
        }
        TableFormatter::new().format_history(&self.runs)
    }
}

pub async fn execute(config: &Config, limit: u32, json_mode: bool) -> Result<()> {
    if !config.history.enabled {
        anyhow::bail!("Execution history is disabled (history.enabled = false)");
    }
    let path = Path::new(&config.history.database_path);
    if !path.exists() {
        output(&HistoryOutput { runs: Vec::new() }, json_mode);
        return Ok(());
    }

    let sink = SqliteHistorySink::connect(path)
        .await
        .with_context(|| format!("Failed to open history database at {}", path.display()))?;
    let runs = sink.recent(limit).await?;
    output(&HistoryOutput { runs }, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_history_is_an_error() {
        let mut config = Config::default();
        config.history.enabled = false;
        let err = execute(&config, 5, true).await.unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[tokio::test]
    async fn test_missing_database_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.history.database_path = dir.path().join("none.db").display().to_string();

        assert!(execute(&config, 5, true).await.is_ok());
        assert!(!dir.path().join("none.db").exists());
    }
}
