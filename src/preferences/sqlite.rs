use super::traits::{Namespace, PreferenceRevision, PreferenceStore};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

/// SQLite-backed preference profiles plus an append-only revision log.
pub struct SqlitePreferenceStore {
    pool: SqlitePool,
}

impl SqlitePreferenceStore {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        init_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn get_impl(&self, namespace: Namespace) -> Result<Option<String>> {
        let row = sqlx::query("SELECT profile FROM preferences WHERE namespace = ?")
            .bind(namespace.as_ref())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read preference profile")?;
        Ok(row.map(|row| row.get::<String, _>("profile")))
    }

    async fn insert_if_absent_impl(&self, namespace: Namespace, profile: &str) -> Result<String> {
        sqlx::query(
            "INSERT OR IGNORE INTO preferences (namespace, profile, updated_at) VALUES (?, ?, ?)",
        )
        .bind(namespace.as_ref())
        .bind(profile)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to seed preference profile")?;

        self.get_impl(namespace)
            .await?
            .with_context(|| format!("preference profile for {namespace} vanished after insert"))
    }

    async fn replace_impl(&self, namespace: Namespace, profile: &str, rationale: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin preference transaction")?;

        sqlx::query(
            "INSERT INTO preferences (namespace, profile, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(namespace) DO UPDATE SET profile = excluded.profile,
                                                  updated_at = excluded.updated_at",
        )
        .bind(namespace.as_ref())
        .bind(profile)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Failed to replace preference profile")?;

        sqlx::query(
            "INSERT INTO preference_history (namespace, profile, rationale, recorded_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(namespace.as_ref())
        .bind(profile)
        .bind(rationale)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Failed to record preference revision")?;

        tx.commit()
            .await
            .context("Failed to commit preference replacement")?;
        Ok(())
    }

    async fn history_impl(
        &self,
        namespace: Namespace,
        limit: usize,
    ) -> Result<Vec<PreferenceRevision>> {
        let rows = sqlx::query(
            "SELECT namespace, profile, rationale, recorded_at FROM preference_history
             WHERE namespace = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(namespace.as_ref())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .context("Failed to read preference history")?;

        rows.iter()
            .map(|row| {
                let raw_namespace: String = row.get("namespace");
                Ok(PreferenceRevision {
                    namespace: Namespace::from_str(&raw_namespace)
                        .with_context(|| format!("unknown namespace in DB: {raw_namespace}"))?,
                    profile: row.get("profile"),
                    rationale: row.get("rationale"),
                    recorded_at: row.get("recorded_at"),
                })
            })
            .collect()
    }
}

async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS preferences (
            namespace  TEXT PRIMARY KEY,
            profile    TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create preferences table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS preference_history (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            namespace   TEXT NOT NULL,
            profile     TEXT NOT NULL,
            rationale   TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create preference_history table")?;

    Ok(())
}

impl PreferenceStore for SqlitePreferenceStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn get<'a>(
        &'a self,
        namespace: Namespace,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(self.get_impl(namespace))
    }

    fn insert_if_absent<'a>(
        &'a self,
        namespace: Namespace,
        profile: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(self.insert_if_absent_impl(namespace, profile))
    }

    fn replace<'a>(
        &'a self,
        namespace: Namespace,
        profile: &'a str,
        rationale: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.replace_impl(namespace, profile, rationale))
    }

    fn history<'a>(
        &'a self,
        namespace: Namespace,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PreferenceRevision>>> + Send + 'a>> {
        Box::pin(self.history_impl(namespace, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::SqlitePreferenceStore;
    use crate::preferences::{Namespace, PreferenceStore};
    use crate::storage::{in_memory_pool, open_pool};

    #[tokio::test]
    async fn insert_if_absent_keeps_first_value() {
        let store = SqlitePreferenceStore::new(in_memory_pool().await.unwrap())
            .await
            .unwrap();
        let first = store.insert_if_absent(Namespace::Triage, "first").await.unwrap();
        let second = store.insert_if_absent(Namespace::Triage, "second").await.unwrap();
        assert_eq!(first, "first");
        assert_eq!(second, "first");
    }

    #[tokio::test]
    async fn replace_overwrites_and_logs_history() {
        let store = SqlitePreferenceStore::new(in_memory_pool().await.unwrap())
            .await
            .unwrap();
        store.insert_if_absent(Namespace::Response, "v1").await.unwrap();
        store
            .replace(Namespace::Response, "v2", "user edited")
            .await
            .unwrap();
        store
            .replace(Namespace::Response, "v3", "user feedback")
            .await
            .unwrap();

        assert_eq!(
            store.get(Namespace::Response).await.unwrap().as_deref(),
            Some("v3")
        );
        let history = store.history(Namespace::Response, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].profile, "v3");
        assert_eq!(history[1].rationale, "user edited");
        assert!(store.history(Namespace::Calendar, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn profiles_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        {
            let store = SqlitePreferenceStore::new(open_pool(&path).await.unwrap())
                .await
                .unwrap();
            store
                .replace(Namespace::Calendar, "mornings only", "feedback")
                .await
                .unwrap();
        }
        let reopened = SqlitePreferenceStore::new(open_pool(&path).await.unwrap())
            .await
            .unwrap();
        assert_eq!(
            reopened.get(Namespace::Calendar).await.unwrap().as_deref(),
            Some("mornings only")
        );
    }
}
