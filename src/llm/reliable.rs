use super::traits::{ModelCapability, RouterDecision, ToolChoice};
use super::types::{ProviderMessage, ProviderResponse};
use crate::tools::ToolSpec;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

const MAX_BACKOFF_MS: u64 = 10_000;

/// Check if an error is non-retryable (client errors that won't resolve with retries).
fn is_non_retryable(err: &anyhow::Error) -> bool {
    let msg = err.to_string();
    if is_quota_exhausted(&msg) || msg.contains("API key not set") {
        return true;
    }

    if let Some(reqwest_err) = err.downcast_ref::<reqwest::Error>()
        && let Some(status) = reqwest_err.status()
    {
        let code = status.as_u16();
        // 429 and 408 are transient
        return status.is_client_error() && code != 429 && code != 408;
    }
    for word in msg.split(|c: char| !c.is_ascii_digit()) {
        if let Ok(code) = word.parse::<u16>()
            && (400..500).contains(&code)
        {
            return code != 429 && code != 408;
        }
    }
    false
}

fn is_quota_exhausted(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("insufficient_quota")
        || lower.contains("exceeded your current quota")
        || lower.contains("billing")
}

/// Model wrapper that retries transient failures with exponential backoff.
pub struct ReliableModel {
    inner: Arc<dyn ModelCapability>,
    max_retries: u32,
    base_backoff_ms: u64,
}

impl ReliableModel {
    pub fn new(inner: Arc<dyn ModelCapability>, max_retries: u32, base_backoff_ms: u64) -> Self {
        Self {
            inner,
            max_retries,
            base_backoff_ms: base_backoff_ms.max(1),
        }
    }

    async fn with_retries<'a, T, F>(&'a self, operation: &'static str, mut call: F) -> anyhow::Result<T>
    where
        T: Send,
        F: FnMut() -> Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>> + Send,
    {
        let mut failures = Vec::new();
        let mut backoff_ms = self.base_backoff_ms;

        for attempt in 0..=self.max_retries {
            match call().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            model = self.inner.name(),
                            operation,
                            attempt,
                            "Model recovered after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => {
                    let non_retryable = is_non_retryable(&e);
                    failures.push(format!(
                        "attempt {}/{}: {e:#}",
                        attempt + 1,
                        self.max_retries + 1
                    ));

                    if non_retryable {
                        tracing::warn!(model = self.inner.name(), operation, "Non-retryable model error");
                        break;
                    }

                    if attempt < self.max_retries {
                        tracing::warn!(
                            model = self.inner.name(),
                            operation,
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            "Model call failed, retrying"
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        backoff_ms = backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
                    }
                }
            }
        }

        anyhow::bail!(
            "{} {operation} failed. Attempts:\n{}",
            self.inner.name(),
            failures.join("\n")
        )
    }
}

impl ModelCapability for ReliableModel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn classify_structured<'a>(
        &'a self,
        system_prompt: &'a str,
        user_prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<RouterDecision>> + Send + 'a>> {
        Box::pin(self.with_retries("classify", move || {
            self.inner.classify_structured(system_prompt, user_prompt)
        }))
    }

    fn generate_with_tools<'a>(
        &'a self,
        system_prompt: &'a str,
        messages: &'a [ProviderMessage],
        tools: &'a [ToolSpec],
        tool_choice: ToolChoice,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        Box::pin(self.with_retries("generate", move || {
            self.inner
                .generate_with_tools(system_prompt, messages, tools, tool_choice)
        }))
    }

    fn merge_profile<'a>(
        &'a self,
        system_prompt: &'a str,
        messages: &'a [ProviderMessage],
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(self.with_retries("merge", move || {
            self.inner.merge_profile(system_prompt, messages)
        }))
    }
}
