use super::{CronJob, CronStore};
use crate::ingest::run_ingest;
use crate::providers::MailProvider;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;

const MIN_POLL_SECONDS: u64 = 5;
const JOB_RETRIES: u32 = 2;
const BASE_BACKOFF_MS: u64 = 500;

/// Poll for due ingestion jobs until `shutdown` fires.
pub async fn run(
    store: CronStore,
    mail: Arc<dyn MailProvider>,
    poll_secs: u64,
    shutdown: CancellationToken,
) {
    let mut interval = time::interval(Duration::from_secs(poll_secs.max(MIN_POLL_SECONDS)));
    tracing::info!(poll_secs = poll_secs.max(MIN_POLL_SECONDS), "scheduler started");

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }
        run_due_jobs(&store, mail.as_ref()).await;
    }
    tracing::info!("scheduler stopped");
}

/// Run every job that is due now and reschedule it. Returns how many ran.
pub async fn run_due_jobs(store: &CronStore, mail: &dyn MailProvider) -> usize {
    let jobs = match store.due_jobs(Utc::now()).await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::warn!("Scheduler query failed: {e:#}");
            return 0;
        }
    };

    let count = jobs.len();
    for job in jobs {
        let (success, output) = execute_job_with_retry(mail, &job).await;
        if success {
            tracing::info!(job = %job.id, "{output}");
        } else {
            tracing::warn!(job = %job.id, "scheduled ingestion failed: {output}");
        }
        if let Err(e) = store.reschedule_after_run(&job, success, &output).await {
            tracing::warn!(job = %job.id, "Failed to persist scheduler run result: {e:#}");
        }
    }
    count
}

async fn execute_job_with_retry(mail: &dyn MailProvider, job: &CronJob) -> (bool, String) {
    let options = job.ingest_options();
    let mut backoff_ms = BASE_BACKOFF_MS;
    let mut last_output = String::new();

    for attempt in 0..=JOB_RETRIES {
        match run_ingest(mail, &options).await {
            Ok(report) => {
                return (
                    true,
                    format!(
                        "fetched {}, submitted {}, skipped {}",
                        report.fetched, report.submitted, report.skipped
                    ),
                );
            }
            Err(e) => last_output = format!("{e:#}"),
        }

        if attempt < JOB_RETRIES {
            let jitter_ms = u64::from(Utc::now().timestamp_subsec_millis() % 250);
            time::sleep(Duration::from_millis(backoff_ms + jitter_ms)).await;
            backoff_ms = backoff_ms.saturating_mul(2).min(30_000);
        }
    }

    (false, last_output)
}

#[cfg(test)]
mod tests {
    use super::run_due_jobs;
    use crate::cron::{CronStore, IngestJobSpec};
    use crate::providers::SimulatedMail;
    use crate::storage::in_memory_pool;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn due_job_runs_ingestion_and_records_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let store = CronStore::new(in_memory_pool().await.unwrap()).await.unwrap();
        let job = store
            .add_job(IngestJobSpec {
                email: "lance@company.com".into(),
                url: server.uri(),
                minutes_since: 30,
                graph_name: "email_assistant_hitl_memory_gmail".into(),
                include_read: false,
                schedule: "* * * * * *".into(),
            })
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert_eq!(run_due_jobs(&store, &SimulatedMail::new()).await, 1);

        let jobs = store.list_jobs().await.unwrap();
        assert_eq!(jobs[0].id, job.id);
        assert_eq!(jobs[0].last_status.as_deref(), Some("ok"));
        assert!(jobs[0].next_run > job.next_run);
    }
}
