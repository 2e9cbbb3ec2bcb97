use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

const MAIL_PROVIDERS: [&str; 2] = ["gmail", "simulated"];
const CALENDAR_PROVIDERS: [&str; 2] = ["google", "simulated"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// "gmail" | "simulated"
    #[serde(default = "default_mail_provider")]
    pub provider: String,
    /// OAuth token file shared by the Gmail and Calendar clients
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default = "default_gmail_api_base")]
    pub api_base: String,
    /// Token JSON supplied through `GMAIL_TOKEN`; never persisted
    #[serde(skip)]
    pub token_json: Option<String>,
}

fn default_mail_provider() -> String {
    "gmail".into()
}

fn default_token_path() -> String {
    "~/.mailsteward/google_token.json".into()
}

fn default_gmail_api_base() -> String {
    "https://gmail.googleapis.com".into()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            provider: default_mail_provider(),
            token_path: default_token_path(),
            api_base: default_gmail_api_base(),
            token_json: None,
        }
    }
}

impl MailConfig {
    pub(super) fn validate(&self) -> Result<()> {
        if !MAIL_PROVIDERS.contains(&self.provider.as_str()) {
            bail!(
                "unknown mail provider '{}' (expected one of: {})",
                self.provider,
                MAIL_PROVIDERS.join(", ")
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// "google" | "simulated"
    #[serde(default = "default_calendar_provider")]
    pub provider: String,
    #[serde(default = "default_calendar_api_base")]
    pub api_base: String,
    #[serde(default = "default_work_start_hour")]
    pub work_start_hour: u32,
    #[serde(default = "default_work_end_hour")]
    pub work_end_hour: u32,
}

fn default_calendar_provider() -> String {
    "google".into()
}

fn default_calendar_api_base() -> String {
    "https://www.googleapis.com".into()
}

fn default_work_start_hour() -> u32 {
    9
}

fn default_work_end_hour() -> u32 {
    17
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            provider: default_calendar_provider(),
            api_base: default_calendar_api_base(),
            work_start_hour: default_work_start_hour(),
            work_end_hour: default_work_end_hour(),
        }
    }
}

impl CalendarConfig {
    pub(super) fn validate(&self) -> Result<()> {
        if !CALENDAR_PROVIDERS.contains(&self.provider.as_str()) {
            bail!(
                "unknown calendar provider '{}' (expected one of: {})",
                self.provider,
                CALENDAR_PROVIDERS.join(", ")
            );
        }
        if self.work_start_hour >= self.work_end_hour || self.work_end_hour > 24 {
            bail!(
                "invalid working hours {}..{}",
                self.work_start_hour,
                self.work_end_hour
            );
        }
        Ok(())
    }
}
