use rand::Rng;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// Exponential backoff for Google API calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_backoff_ms
            .saturating_mul(1_u64 << attempt.min(16))
            .min(self.max_backoff_ms);
        let jitter = rand::rng().random_range(0..=self.base_backoff_ms / 2);
        Duration::from_millis(exp + jitter)
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// Send the request built by `build`, retrying on 408/429/5xx and transport
/// errors. Non-retryable responses are returned as-is for the caller to map.
pub async fn send_with_retry<F>(
    policy: RetryPolicy,
    provider: &str,
    mut build: F,
) -> Result<Response, reqwest::Error>
where
    F: FnMut() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        match build().send().await {
            Ok(response) if is_retryable_status(response.status()) && attempt < policy.max_retries => {
                tracing::warn!(
                    provider,
                    status = response.status().as_u16(),
                    attempt = attempt + 1,
                    "retryable API status, backing off"
                );
            }
            Ok(response) => return Ok(response),
            Err(error) if attempt < policy.max_retries && (error.is_connect() || error.is_timeout()) => {
                tracing::warn!(provider, attempt = attempt + 1, "transport error, backing off: {error}");
            }
            Err(error) => return Err(error),
        }
        tokio::time::sleep(policy.delay(attempt)).await;
        attempt += 1;
    }
}
