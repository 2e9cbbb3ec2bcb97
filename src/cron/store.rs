use super::expression::{next_run_for, parse_rfc3339};
use super::{CronJob, IngestJobSpec};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const SELECT_COLUMNS: &str = "SELECT id, email, url, minutes_since, graph_name, include_read,
        schedule, next_run, last_run, last_status
     FROM cron_jobs";

/// Ingestion jobs persisted next to the workflow state.
#[derive(Clone)]
pub struct CronStore {
    pool: SqlitePool,
}

impl CronStore {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cron_jobs (
                id            TEXT PRIMARY KEY,
                email         TEXT NOT NULL,
                url           TEXT NOT NULL,
                minutes_since INTEGER NOT NULL,
                graph_name    TEXT NOT NULL,
                include_read  INTEGER NOT NULL DEFAULT 0,
                schedule      TEXT NOT NULL,
                created_at    TEXT NOT NULL,
                next_run      TEXT NOT NULL,
                last_run      TEXT,
                last_status   TEXT,
                last_output   TEXT
            )",
        )
        .execute(&pool)
        .await
        .context("Failed to initialize cron schema")?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cron_jobs_next_run ON cron_jobs(next_run)")
            .execute(&pool)
            .await
            .context("Failed to create cron index")?;
        Ok(Self { pool })
    }

    pub async fn add_job(&self, spec: IngestJobSpec) -> Result<CronJob> {
        let now = Utc::now();
        let next_run = next_run_for(&spec.schedule, now)?;
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO cron_jobs (
                id, email, url, minutes_since, graph_name, include_read, schedule, created_at, next_run
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&id)
        .bind(&spec.email)
        .bind(&spec.url)
        .bind(i64::from(spec.minutes_since))
        .bind(&spec.graph_name)
        .bind(spec.include_read)
        .bind(&spec.schedule)
        .bind(now.to_rfc3339())
        .bind(next_run.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to insert cron job")?;

        Ok(CronJob {
            id,
            spec,
            next_run,
            last_run: None,
            last_status: None,
        })
    }

    pub async fn list_jobs(&self) -> Result<Vec<CronJob>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY next_run ASC"))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list cron jobs")?;
        rows.iter().map(job_from_row).collect()
    }

    pub async fn remove_job(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM cron_jobs WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete cron job")?;
        if result.rows_affected() == 0 {
            anyhow::bail!("Cron job '{id}' not found");
        }
        Ok(())
    }

    pub async fn due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<CronJob>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE next_run <= ?1 ORDER BY next_run ASC"
        ))
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .context("Failed to query due cron jobs")?;
        rows.iter().map(job_from_row).collect()
    }

    pub async fn reschedule_after_run(
        &self,
        job: &CronJob,
        success: bool,
        output: &str,
    ) -> Result<()> {
        let now = Utc::now();
        let next_run = next_run_for(&job.spec.schedule, now)?;
        let status = if success { "ok" } else { "error" };

        sqlx::query(
            "UPDATE cron_jobs
             SET next_run = ?1, last_run = ?2, last_status = ?3, last_output = ?4
             WHERE id = ?5",
        )
        .bind(next_run.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(status)
        .bind(output)
        .bind(&job.id)
        .execute(&self.pool)
        .await
        .context("Failed to update cron job run state")?;
        Ok(())
    }
}

fn job_from_row(row: &SqliteRow) -> Result<CronJob> {
    let minutes_since: i64 = row.get("minutes_since");
    let next_run: String = row.get("next_run");
    let last_run: Option<String> = row.get("last_run");
    Ok(CronJob {
        id: row.get("id"),
        spec: IngestJobSpec {
            email: row.get("email"),
            url: row.get("url"),
            minutes_since: u32::try_from(minutes_since).unwrap_or(u32::MAX),
            graph_name: row.get("graph_name"),
            include_read: row.get("include_read"),
            schedule: row.get("schedule"),
        },
        next_run: parse_rfc3339(&next_run)?,
        last_run: last_run.as_deref().map(parse_rfc3339).transpose()?,
        last_status: row.get("last_status"),
    })
}
