use crate::config::Config;
use crate::llm::ModelCapability;
use crate::preferences::{PreferenceStore, Preferences};
use crate::prompt::DEFAULT_BACKGROUND;
use crate::providers::{Collaborators, MailProvider};
use crate::tools::{ToolRegistry, assistant_tools};
use std::sync::Arc;

/// Who the assistant works for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantProfile {
    pub user_name: String,
    pub user_address: String,
    pub background: String,
    pub timezone: String,
    pub max_agent_steps: u32,
}

impl AssistantProfile {
    pub fn from_config(config: &Config) -> Self {
        let assistant = &config.assistant;
        Self {
            user_name: assistant.user_name.clone(),
            user_address: assistant.user_address.clone(),
            background: assistant
                .background
                .clone()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string()),
            timezone: assistant.timezone.clone(),
            max_agent_steps: assistant.max_agent_steps,
        }
    }
}

impl Default for AssistantProfile {
    fn default() -> Self {
        Self {
            user_name: "Lance".into(),
            user_address: String::new(),
            background: DEFAULT_BACKGROUND.into(),
            timezone: "America/Los_Angeles".into(),
            max_agent_steps: 12,
        }
    }
}

/// Collaborators every workflow stage draws on, shared across threads.
#[derive(Clone)]
pub struct AssistantContext {
    pub model: Arc<dyn ModelCapability>,
    pub tools: Arc<ToolRegistry>,
    pub preferences: Preferences,
    pub mail: Arc<dyn MailProvider>,
    pub profile: AssistantProfile,
}

impl AssistantContext {
    pub fn new(
        model: Arc<dyn ModelCapability>,
        collaborators: &Collaborators,
        store: Arc<dyn PreferenceStore>,
        profile: AssistantProfile,
    ) -> Self {
        let tools = assistant_tools(collaborators, &profile.user_address, &profile.timezone);
        Self {
            preferences: Preferences::new(store, Arc::clone(&model)),
            model,
            tools: Arc::new(tools),
            mail: Arc::clone(&collaborators.mail),
            profile,
        }
    }

    /// Swap the tool set, e.g. to register additional tools.
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Arc::new(tools);
        self
    }
}
