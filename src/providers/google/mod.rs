//! REST clients for Gmail and Google Calendar.

pub mod auth;
pub mod calendar;
pub mod gmail;
pub mod retry;

pub use auth::{GoogleToken, TokenSource};
pub use calendar::GoogleCalendarClient;
pub use gmail::GmailClient;
pub use retry::RetryPolicy;

use super::error::{ProviderError, ProviderResult};
use crate::llm::scrub::sanitize_api_error;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub(crate) fn build_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| Client::new())
}

async fn ensure_success(provider: &'static str, response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    Err(ProviderError::Api {
        provider,
        status: status.as_u16(),
        message: sanitize_api_error(&body),
    })
}

async fn decode_json<T: DeserializeOwned>(
    provider: &'static str,
    response: Response,
) -> ProviderResult<T> {
    ensure_success(provider, response)
        .await?
        .json()
        .await
        .map_err(|e| ProviderError::Decode(e.to_string()))
}
