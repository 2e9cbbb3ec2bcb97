use super::super::{
    AssistantConfig, CalendarConfig, GatewayConfig, IngestConfig, MailConfig,
    ObservabilityConfig, ReliabilityConfig, SchedulerConfig,
};
use crate::llm::openai::DEFAULT_API_URL;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,
}

fn default_model() -> String {
    "gpt-4.1".into()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::from("."),
            config_path: PathBuf::from("config.toml"),
            api_key: None,
            model: default_model(),
            temperature: 0.0,
            api_url: default_api_url(),
            assistant: AssistantConfig::default(),
            mail: MailConfig::default(),
            calendar: CalendarConfig::default(),
            gateway: GatewayConfig::default(),
            ingest: IngestConfig::default(),
            scheduler: SchedulerConfig::default(),
            observability: ObservabilityConfig::default(),
            reliability: ReliabilityConfig::default(),
        }
    }
}

impl Config {
    /// SQLite database shared by checkpoints, preferences and cron jobs.
    pub fn database_path(&self) -> PathBuf {
        self.workspace_dir.join("state.db")
    }

    pub fn validate(&self) -> Result<()> {
        if self.assistant.max_agent_steps == 0 {
            bail!("assistant.max_agent_steps must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!("temperature must be within 0.0..=2.0 (got {})", self.temperature);
        }
        self.mail.validate()?;
        self.calendar.validate()?;
        Ok(())
    }
}
