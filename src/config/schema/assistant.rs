use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Name the assistant acts on behalf of
    #[serde(default = "default_user_name")]
    pub user_name: String,
    /// Mailbox address of that user; used for thread filtering and as sender
    #[serde(default)]
    pub user_address: String,
    /// Free-text background replacing the built-in one
    #[serde(default)]
    pub background: Option<String>,
    /// Default timezone for scheduled meetings
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Upper bound on model turns per email (default: 12)
    #[serde(default = "default_max_agent_steps")]
    pub max_agent_steps: u32,
}

fn default_user_name() -> String {
    "Lance".into()
}

fn default_timezone() -> String {
    "America/Los_Angeles".into()
}

fn default_max_agent_steps() -> u32 {
    12
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            user_name: default_user_name(),
            user_address: String::new(),
            background: None,
            timezone: default_timezone(),
            max_agent_steps: default_max_agent_steps(),
        }
    }
}
