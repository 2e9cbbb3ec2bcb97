use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    /// Extra attempts per model call after the first one fails
    #[serde(default = "default_model_retries")]
    pub model_retries: u32,
    #[serde(default = "default_model_backoff_ms")]
    pub model_backoff_ms: u64,
}

fn default_model_retries() -> u32 {
    2
}

fn default_model_backoff_ms() -> u64 {
    500
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            model_retries: default_model_retries(),
            model_backoff_ms: default_model_backoff_ms(),
        }
    }
}
