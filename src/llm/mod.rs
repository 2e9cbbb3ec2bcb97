pub mod openai;
pub mod reliable;
pub mod scrub;
pub mod traits;
pub mod types;

pub use openai::OpenAiModel;
pub use reliable::ReliableModel;
pub use scrub::scrub_secret_patterns;
pub use traits::{ModelCapability, RouterDecision, ToolChoice};
pub use types::{
    ContentBlock, MessageRole, ProviderMessage, ProviderResponse, StopReason, ToolCall,
    messages_to_text,
};

use crate::config::Config;
use std::sync::Arc;

/// Build the model client described by the config, wrapped with retries.
pub fn create_model(config: &Config) -> Arc<dyn ModelCapability> {
    if config.api_key.is_none() {
        tracing::warn!("no API key configured; model calls will fail until one is set");
    }
    let model = Arc::new(OpenAiModel::new(
        config.api_key.as_deref(),
        &config.api_url,
        &config.model,
        config.temperature,
    ));
    Arc::new(ReliableModel::new(
        model,
        config.reliability.model_retries,
        config.reliability.model_backoff_ms,
    ))
}
