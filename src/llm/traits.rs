use super::types::{ProviderMessage, ProviderResponse};
use crate::tools::ToolSpec;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Raw triage verdict as returned by the model. The classification is kept
/// as text so that the workflow can reject values outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterDecision {
    pub reasoning: String,
    pub classification: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    Required,
}

impl ToolChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Required => "required",
        }
    }
}

/// The three model operations the assistant relies on.
pub trait ModelCapability: Send + Sync {
    /// Identifier used in logs (e.g. "openai").
    fn name(&self) -> &str;

    fn classify_structured<'a>(
        &'a self,
        system_prompt: &'a str,
        user_prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<RouterDecision>> + Send + 'a>>;

    fn generate_with_tools<'a>(
        &'a self,
        system_prompt: &'a str,
        messages: &'a [ProviderMessage],
        tools: &'a [ToolSpec],
        tool_choice: ToolChoice,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>>;

    /// Produce a complete replacement profile. `system_prompt` already embeds
    /// the current profile and the namespace label.
    fn merge_profile<'a>(
        &'a self,
        system_prompt: &'a str,
        messages: &'a [ProviderMessage],
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
}
