//! Mailbox ingestion: fetch recent mail, pick the messages that still need
//! attention and hand each one to the workflow gateway.

pub mod client;

pub use client::GatewayClient;

use crate::providers::{FetchFilter, FetchedMessage, MailItem, MailProvider};
use anyhow::{Context, Result};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One ingestion pass, as given on the command line or by a cron job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    pub email: String,
    pub minutes_since: u32,
    pub graph_name: String,
    pub url: String,
    pub include_read: bool,
    pub rerun: bool,
    pub early: bool,
    pub skip_filters: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub fetched: usize,
    pub submitted: usize,
    pub skipped: usize,
}

/// Workflow thread id for a mailbox thread. Stable across runs so a thread
/// is never processed twice by accident.
pub fn workflow_thread_id(mailbox_thread_id: &str) -> String {
    let digest = Sha256::digest(mailbox_thread_id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}

/// The message of `item` that should be processed, if any.
///
/// Threads the user already answered last are skipped, as are matches that
/// were sent by the user or are not the newest message of their thread.
/// `skip_filters` processes the newest message unconditionally.
pub fn select_message<'a>(
    item: &'a MailItem,
    user_address: &str,
    skip_filters: bool,
) -> Option<&'a FetchedMessage> {
    let latest = item.latest_in_thread();
    if skip_filters {
        return Some(latest);
    }
    if latest.from_header.contains(user_address) {
        debug!(thread = %item.message.thread_id, "user sent the last message; skipping");
        return None;
    }
    let from_user = item.message.from_header.contains(user_address);
    let is_latest = item.message.id == latest.id;
    (!from_user && is_latest).then_some(&item.message)
}

/// Gateway `email_input` payload for a fetched message.
pub fn email_input(message: &FetchedMessage) -> serde_json::Value {
    let envelope = &message.envelope;
    json!({
        "from": envelope.author,
        "to": envelope.recipient,
        "subject": envelope.subject,
        "body": envelope.thread_text,
        "id": message.id,
    })
}

pub async fn run_ingest(mail: &dyn MailProvider, options: &IngestOptions) -> Result<IngestReport> {
    let filter = FetchFilter {
        email_address: options.email.clone(),
        minutes_since: options.minutes_since,
        include_read: options.include_read,
    };
    let items = mail
        .fetch(&filter)
        .await
        .with_context(|| format!("failed to fetch mail from {}", mail.name()))?;
    let gateway = GatewayClient::new(&options.url)?;

    let mut report = IngestReport {
        fetched: items.len(),
        ..IngestReport::default()
    };
    info!(count = items.len(), provider = mail.name(), "fetched mail");

    for item in &items {
        let Some(message) = select_message(item, &options.email, options.skip_filters) else {
            report.skipped += 1;
            continue;
        };
        let thread_id = workflow_thread_id(&message.thread_id);
        if !options.rerun && gateway.thread_exists(&thread_id).await? {
            info!(thread_id = %thread_id, "thread already processed; skipping");
            report.skipped += 1;
            continue;
        }

        gateway
            .create_run(
                &thread_id,
                &options.graph_name,
                &email_input(message),
                options.rerun,
            )
            .await
            .with_context(|| format!("failed to submit message {}", message.id))?;
        info!(
            thread_id = %thread_id,
            mailbox_thread = %message.thread_id,
            subject = %message.envelope.subject,
            "submitted email"
        );
        report.submitted += 1;

        if options.early {
            debug!("early stop after first submitted email");
            break;
        }
    }

    if report.submitted == 0 && report.fetched > 0 {
        warn!(skipped = report.skipped, "no fetched email needed processing");
    }
    Ok(report)
}
