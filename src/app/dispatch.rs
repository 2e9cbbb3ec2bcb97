use super::runtime::{Stores, build_engine};
use crate::Config;
use crate::cli::{Cli, Commands};
use crate::cron::{self, CronStore, IngestJobSpec};
use crate::email::parse_envelope;
use crate::gateway::run_gateway;
use crate::ingest::{IngestOptions, run_ingest};
use crate::preferences::{Namespace, PreferenceStore};
use crate::providers::create_collaborators;
use crate::storage::open_pool;
use crate::workflow::{CliReviewBroker, RunOutcome, WorkflowEngine, settle_with};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            serve(&config, &host, port).await
        }
        Commands::Ingest {
            email,
            minutes_since,
            graph_name,
            url,
            include_read,
            rerun,
            early,
            skip_filters,
        } => {
            let options = IngestOptions {
                email,
                minutes_since: minutes_since.unwrap_or(config.ingest.minutes_since),
                graph_name: graph_name.unwrap_or_else(|| config.ingest.graph_name.clone()),
                url: url.unwrap_or_else(|| config.ingest.url.clone()),
                include_read,
                rerun,
                early,
                skip_filters,
            };
            let collaborators = create_collaborators(&config);
            let report = run_ingest(collaborators.mail.as_ref(), &options).await?;
            println!(
                "✅ Ingestion finished: {} fetched, {} submitted, {} skipped",
                report.fetched, report.submitted, report.skipped
            );
            Ok(())
        }
        Commands::Cron {
            email,
            url,
            minutes_since,
            schedule,
            graph_name,
            include_read,
        } => {
            let store = cron_store(&config).await?;
            let job = store
                .add_job(IngestJobSpec {
                    email,
                    url: url.unwrap_or_else(|| config.ingest.url.clone()),
                    minutes_since,
                    graph_name: graph_name.unwrap_or_else(|| config.ingest.graph_name.clone()),
                    include_read,
                    schedule,
                })
                .await?;
            println!("✅ Added ingestion job {}", job.id);
            println!("  Expr: {}", job.spec.schedule);
            println!("  Next: {}", job.next_run.to_rfc3339());
            println!("  Mail: {} → {}", job.spec.email, job.spec.url);
            Ok(())
        }
        Commands::CronList => {
            let jobs = cron_store(&config).await?.list_jobs().await?;
            cron::print_jobs(&jobs);
            Ok(())
        }
        Commands::CronRemove { id } => {
            cron_store(&config).await?.remove_job(&id).await?;
            println!("✅ Removed ingestion job {id}");
            Ok(())
        }
        Commands::Run {
            file,
            thread_id,
            ephemeral,
        } => {
            let stores = if ephemeral {
                Stores::ephemeral()
            } else {
                Stores::open(&config).await?
            };
            let engine = build_engine(&config, &stores);
            run_file(&engine, &file, thread_id).await
        }
        Commands::Review { thread_id } => {
            let stores = Stores::open(&config).await?;
            let engine = build_engine(&config, &stores);
            review_pending(&engine, thread_id.as_deref()).await
        }
        Commands::Preferences { history } => {
            let stores = Stores::open(&config).await?;
            print_preferences(stores.preferences.as_ref(), history).await
        }
    }
}

async fn cron_store(config: &Config) -> Result<CronStore> {
    CronStore::new(open_pool(&config.database_path()).await?).await
}

async fn serve(config: &Config, host: &str, port: u16) -> Result<()> {
    let stores = Stores::open(config).await?;
    let engine = Arc::new(build_engine(config, &stores));
    let shutdown = CancellationToken::new();

    tokio::spawn(recover_periodically(
        Arc::clone(&engine),
        config.scheduler.poll_secs,
        shutdown.clone(),
    ));

    let scheduler = match &stores.pool {
        Some(pool) => {
            let store = CronStore::new(pool.clone()).await?;
            Some(tokio::spawn(cron::scheduler::run(
                store,
                Arc::clone(&engine.context().mail),
                config.scheduler.poll_secs,
                shutdown.clone(),
            )))
        }
        None => None,
    };

    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
        }
        on_signal.cancel();
    });

    let served = run_gateway(host, port, engine, shutdown.clone()).await;
    shutdown.cancel();
    if let Some(handle) = scheduler
        && let Err(e) = handle.await
    {
        warn!("scheduler task ended abnormally: {e}");
    }
    served
}

/// Continue interrupted threads at startup and then on every poll tick.
async fn recover_periodically(engine: Arc<WorkflowEngine>, poll_secs: u64, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(poll_secs.max(1)));
    loop {
        tokio::select! {
            () = shutdown.cancelled() => return,
            _ = interval.tick() => {}
        }
        match engine.recover_interrupted().await {
            Ok(outcomes) if !outcomes.is_empty() => {
                info!(count = outcomes.len(), "recovered interrupted workflows");
            }
            Ok(_) => {}
            Err(e) => warn!("could not scan for interrupted workflows: {e}"),
        }
    }
}

async fn run_file(engine: &WorkflowEngine, file: &Path, thread_id: Option<String>) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    let envelope = parse_envelope(&value)?;
    let thread_id = thread_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let outcome = engine.start(&thread_id, envelope, true).await?;
    let outcome = settle_with(engine, outcome, &CliReviewBroker).await?;
    print_outcome(&outcome);
    Ok(())
}

async fn review_pending(engine: &WorkflowEngine, only: Option<&str>) -> Result<()> {
    let suspended = engine.suspended().await?;
    let suspended: Vec<_> = suspended
        .into_iter()
        .filter(|checkpoint| only.is_none_or(|id| checkpoint.thread_id == id))
        .collect();
    if suspended.is_empty() {
        println!("No threads are waiting for review.");
        return Ok(());
    }

    println!("📬 {} thread(s) waiting for review", suspended.len());
    for checkpoint in suspended {
        if let Some(state) = &checkpoint.state {
            eprintln!(
                "\n{} {}",
                style("Thread").bold(),
                style(&checkpoint.thread_id).dim()
            );
            eprintln!("Subject: {}", state.envelope.subject);
        }
        let outcome = RunOutcome::Suspended {
            thread_id: checkpoint.thread_id.clone(),
            requests: checkpoint.pending().to_vec(),
        };
        let outcome = settle_with(engine, outcome, &CliReviewBroker).await?;
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed {
            thread_id,
            classification,
        } => println!("✅ Thread {thread_id} completed ({classification})"),
        RunOutcome::Suspended {
            thread_id,
            requests,
        } => println!(
            "⏸  Thread {thread_id} waiting on {} review(s)",
            requests.len()
        ),
    }
}

async fn print_preferences(store: &dyn PreferenceStore, history: usize) -> Result<()> {
    for namespace in Namespace::iter() {
        let stored = store.get(namespace).await?;
        let (profile, origin) = match stored {
            Some(profile) if !profile.trim().is_empty() => (profile, "learned"),
            _ => (namespace.default_profile().to_string(), "default"),
        };
        println!("{} ({origin})", style(namespace.label()).bold().cyan());
        println!("{}\n", profile.trim());

        if history > 0 {
            for revision in store.history(namespace, history).await? {
                println!(
                    "  {} {}",
                    style(&revision.recorded_at).dim(),
                    revision.rationale.lines().next().unwrap_or_default()
                );
            }
            println!();
        }
    }
    Ok(())
}
