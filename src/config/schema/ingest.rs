use serde::{Deserialize, Serialize};

pub const DEFAULT_GRAPH_NAME: &str = "email_assistant_hitl_memory_gmail";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Look-back window for `mailsteward ingest` (minutes)
    #[serde(default = "default_minutes_since")]
    pub minutes_since: u32,
    #[serde(default = "default_graph_name")]
    pub graph_name: String,
    /// Base URL of the gateway that runs the workflow
    #[serde(default = "default_url")]
    pub url: String,
}

fn default_minutes_since() -> u32 {
    120
}

fn default_graph_name() -> String {
    DEFAULT_GRAPH_NAME.into()
}

fn default_url() -> String {
    "http://127.0.0.1:2024".into()
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            minutes_since: default_minutes_since(),
            graph_name: default_graph_name(),
            url: default_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

fn default_poll_secs() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_secs: default_poll_secs(),
        }
    }
}
