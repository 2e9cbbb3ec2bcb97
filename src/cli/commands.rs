use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `mailsteward` - human-in-the-loop email triage and reply assistant.
#[derive(Parser, Debug)]
#[command(name = "mailsteward")]
#[command(author = "theonlyhennygod")]
#[command(version = "0.1.0")]
#[command(about = "Triage incoming email, draft replies and learn from your reviews.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the workflow gateway and the ingestion scheduler
    Serve {
        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Fetch recent mail and submit it to the gateway
    Ingest {
        /// Mailbox address to ingest
        #[arg(long)]
        email: String,

        /// Only consider mail from the last N minutes
        #[arg(long)]
        minutes_since: Option<u32>,

        /// Workflow graph to run on the gateway
        #[arg(long)]
        graph_name: Option<String>,

        /// Gateway base URL
        #[arg(long)]
        url: Option<String>,

        /// Include messages already marked as read
        #[arg(long)]
        include_read: bool,

        /// Process threads even if they were processed before
        #[arg(long)]
        rerun: bool,

        /// Stop after the first submitted email
        #[arg(long)]
        early: bool,

        /// Submit the latest message of every thread, whoever sent it
        #[arg(long)]
        skip_filters: bool,
    },

    /// Schedule a recurring ingestion job
    Cron {
        /// Mailbox address to ingest
        #[arg(long)]
        email: String,

        /// Gateway base URL
        #[arg(long)]
        url: Option<String>,

        /// Look-back window of each run, in minutes
        #[arg(long, default_value_t = 60)]
        minutes_since: u32,

        /// Cron expression (5-field crontab, or 6/7 fields with seconds)
        #[arg(long, default_value = "*/10 * * * *")]
        schedule: String,

        /// Workflow graph to run on the gateway
        #[arg(long)]
        graph_name: Option<String>,

        /// Include messages already marked as read
        #[arg(long)]
        include_read: bool,
    },

    /// List scheduled ingestion jobs
    CronList,

    /// Remove a scheduled ingestion job
    CronRemove {
        /// Job id as shown by `cron-list`
        id: String,
    },

    /// Process one email from a JSON file and review proposals on the terminal
    Run {
        /// Email as JSON (dataset, ingestion or Gmail message format)
        #[arg(long)]
        file: PathBuf,

        /// Workflow thread id (random when omitted)
        #[arg(long)]
        thread_id: Option<String>,

        /// Keep state and preferences in memory only
        #[arg(long)]
        ephemeral: bool,
    },

    /// Answer pending reviews of suspended threads
    Review {
        /// Only review this thread
        #[arg(long)]
        thread_id: Option<String>,
    },

    /// Show learned preference profiles
    Preferences {
        /// Also show the last N revisions of each profile
        #[arg(long, default_value_t = 0)]
        history: usize,
    },
}
