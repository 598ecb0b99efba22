//! SQLite execution history.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::RunRecord;
use crate::domain::ports::ExecutionHistorySink;

const CREATE_RUNS_TABLE: &str = "CREATE TABLE IF NOT EXISTS pipeline_runs (
    run_id TEXT PRIMARY KEY,
    task TEXT NOT NULL,
    correlation_id TEXT,
    conversation_id TEXT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    mode TEXT NOT NULL,
    quality_score REAL NOT NULL,
    judge_score REAL,
    refinement_rounds INTEGER NOT NULL DEFAULT 0,
    record TEXT NOT NULL
)";

const CREATE_FINISHED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_pipeline_runs_finished ON pipeline_runs(finished_at)";

/// History sink storing one row per run, with the full record as JSON.
#[derive(Debug, Clone)]
pub struct SqliteHistorySink {
    pool: SqlitePool,
}

impl SqliteHistorySink {
    /// Open (creating if missing) the database at `path` and ensure the schema.
    pub async fn connect(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DomainError::History(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        let sink = Self { pool };
        sink.migrate().await?;
        Ok(sink)
    }

    /// In-memory database, for tests and dry runs.
    pub async fn in_memory() -> DomainResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let sink = Self { pool };
        sink.migrate().await?;
        Ok(sink)
    }

    async fn migrate(&self) -> DomainResult<()> {
        sqlx::query(CREATE_RUNS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_FINISHED_INDEX).execute(&self.pool).await?;
        Ok(())
    }

    /// Most recent runs first.
    pub async fn recent(&self, limit: u32) -> DomainResult<Vec<RunRecord>> {
        let rows = sqlx::query("SELECT record FROM pipeline_runs ORDER BY finished_at DESC LIMIT ?")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let json: String = row.try_get("record")?;
                serde_json::from_str(&json)
                    .map_err(|e| DomainError::History(format!("corrupt run record: {e}")))
            })
            .collect()
    }

    pub async fn count(&self) -> DomainResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM pipeline_runs")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}

#[async_trait]
impl ExecutionHistorySink for SqliteHistorySink {
    async fn record(&self, record: &RunRecord) -> DomainResult<()> {
        let json = serde_json::to_string(record)
            .map_err(|e| DomainError::History(format!("failed to encode run record: {e}")))?;

        sqlx::query(
            "INSERT OR REPLACE INTO pipeline_runs
                (run_id, task, correlation_id, conversation_id, started_at, finished_at,
                 mode, quality_score, judge_score, refinement_rounds, record)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.run_id.to_string())
        .bind(&record.task)
        .bind(&record.correlation_id)
        .bind(&record.conversation_id)
        .bind(record.started_at.to_rfc3339())
        .bind(record.finished_at.to_rfc3339())
        .bind(&record.mode)
        .bind(record.quality_score)
        .bind(record.judge_score)
        .bind(i64::from(record.refinement_rounds))
        .bind(json)
        .execute(&self.pool)
        .await?;

        debug!(run_id = %record.run_id, "run recorded");
        Ok(())
    }
}
