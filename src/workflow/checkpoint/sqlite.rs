use super::{Checkpoint, CheckpointStore};
use crate::workflow::state::{Classification, ConversationState, RunStatus};
use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

/// Thread checkpoints in the shared SQLite database. The conversation state
/// is stored as a JSON document next to the indexed status columns.
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS threads (
                thread_id      TEXT PRIMARY KEY,
                status         TEXT NOT NULL,
                classification TEXT,
                state_json     TEXT,
                error          TEXT,
                updated_at     TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .context("Failed to create threads table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_threads_status ON threads(status)")
            .execute(&pool)
            .await
            .context("Failed to create threads status index")?;

        Ok(Self { pool })
    }

    async fn save_impl(&self, checkpoint: &Checkpoint) -> Result<()> {
        let state_json = checkpoint
            .state
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize conversation state")?;

        sqlx::query(
            "INSERT INTO threads (thread_id, status, classification, state_json, error, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(thread_id) DO UPDATE SET status = excluded.status,
                                                  classification = excluded.classification,
                                                  state_json = excluded.state_json,
                                                  error = excluded.error,
                                                  updated_at = excluded.updated_at",
        )
        .bind(&checkpoint.thread_id)
        .bind(checkpoint.status.to_string())
        .bind(checkpoint.classification.map(|c| c.to_string()))
        .bind(state_json)
        .bind(checkpoint.error.as_deref())
        .bind(&checkpoint.updated_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save checkpoint for thread {}", checkpoint.thread_id))?;
        Ok(())
    }

    async fn load_impl(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            "SELECT thread_id, status, classification, state_json, error, updated_at
             FROM threads WHERE thread_id = ?",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load checkpoint for thread {thread_id}"))?;
        row.as_ref().map(checkpoint_from_row).transpose()
    }

    async fn list_impl(&self, status: RunStatus) -> Result<Vec<Checkpoint>> {
        let rows = sqlx::query(
            "SELECT thread_id, status, classification, state_json, error, updated_at
             FROM threads WHERE status = ? ORDER BY updated_at ASC",
        )
        .bind(status.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list checkpoints")?;
        rows.iter().map(checkpoint_from_row).collect()
    }
}

fn checkpoint_from_row(row: &SqliteRow) -> Result<Checkpoint> {
    let thread_id: String = row.get("thread_id");
    let raw_status: String = row.get("status");
    let raw_classification: Option<String> = row.get("classification");
    let state_json: Option<String> = row.get("state_json");

    let state = state_json
        .map(|json| serde_json::from_str::<ConversationState>(&json))
        .transpose()
        .with_context(|| format!("Corrupt state for thread {thread_id}"))?;

    Ok(Checkpoint {
        status: RunStatus::from_str(&raw_status)
            .with_context(|| format!("unknown status in DB: {raw_status}"))?,
        classification: raw_classification
            .map(|raw| {
                Classification::from_str(&raw)
                    .with_context(|| format!("unknown classification in DB: {raw}"))
            })
            .transpose()?,
        state,
        error: row.get("error"),
        updated_at: row.get("updated_at"),
        thread_id,
    })
}

impl CheckpointStore for SqliteCheckpointStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn save<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(self.save_impl(checkpoint))
    }

    fn load<'a>(
        &'a self,
        thread_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Checkpoint>>> + Send + 'a>> {
        Box::pin(self.load_impl(thread_id))
    }

    fn list<'a>(
        &'a self,
        status: RunStatus,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<Checkpoint>>> + Send + 'a>> {
        Box::pin(self.list_impl(status))
    }
}
