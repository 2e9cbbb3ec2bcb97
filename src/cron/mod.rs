//! Recurring mailbox ingestion jobs.

mod expression;
pub mod scheduler;
mod store;

pub use expression::next_run_for;
pub use store::CronStore;

use crate::ingest::IngestOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything needed to run one ingestion on a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestJobSpec {
    pub email: String,
    pub url: String,
    pub minutes_since: u32,
    pub graph_name: String,
    pub include_read: bool,
    pub schedule: String,
}

#[derive(Debug, Clone)]
pub struct CronJob {
    pub id: String,
    pub spec: IngestJobSpec,
    pub next_run: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub last_status: Option<String>,
}

impl CronJob {
    /// Scheduled runs never rerun processed threads and never stop early.
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            email: self.spec.email.clone(),
            minutes_since: self.spec.minutes_since,
            graph_name: self.spec.graph_name.clone(),
            url: self.spec.url.clone(),
            include_read: self.spec.include_read,
            rerun: false,
            early: false,
            skip_filters: false,
        }
    }
}

pub fn print_jobs(jobs: &[CronJob]) {
    if jobs.is_empty() {
        println!("No scheduled ingestion jobs yet.");
        println!("\nUsage:");
        println!("  mailsteward cron --email you@example.com --schedule '*/10 * * * *'");
        return;
    }

    println!("🕒 Scheduled ingestion jobs ({}):", jobs.len());
    for job in jobs {
        let last_run = job
            .last_run
            .map_or_else(|| "never".into(), |d| d.to_rfc3339());
        let last_status = job.last_status.as_deref().unwrap_or("n/a");
        println!(
            "- {} | {} | next={} | last={} ({})\n    {} → {} (last {} min, graph {}{})",
            job.id,
            job.spec.schedule,
            job.next_run.to_rfc3339(),
            last_run,
            last_status,
            job.spec.email,
            job.spec.url,
            job.spec.minutes_since,
            job.spec.graph_name,
            if job.spec.include_read { ", include read" } else { "" },
        );
    }
}
