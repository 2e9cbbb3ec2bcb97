use crate::llm::scrub::sanitize_api_error;
use crate::providers::error::{ProviderError, ProviderResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Authorized-user token as written by Google's OAuth tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleToken {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// RFC 3339 expiry of `token`, when known.
    #[serde(default)]
    pub expiry: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

impl Default for GoogleToken {
    fn default() -> Self {
        Self {
            token: None,
            refresh_token: None,
            token_uri: default_token_uri(),
            client_id: None,
            client_secret: None,
            expiry: None,
        }
    }
}

impl GoogleToken {
    /// Token from inline JSON (the `GMAIL_TOKEN` value) or, failing that,
    /// from the token file.
    pub fn load(inline_json: Option<&str>, token_path: &str) -> ProviderResult<Self> {
        if let Some(raw) = inline_json.filter(|raw| !raw.trim().is_empty()) {
            match serde_json::from_str(raw) {
                Ok(token) => {
                    tracing::debug!("using Google token from GMAIL_TOKEN");
                    return Ok(token);
                }
                Err(e) => tracing::warn!("could not parse GMAIL_TOKEN, trying token file: {e}"),
            }
        }

        let path = PathBuf::from(shellexpand::tilde(token_path).into_owned());
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            ProviderError::CredentialUnavailable(format!(
                "no Google token in GMAIL_TOKEN and {} is unreadable: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ProviderError::CredentialUnavailable(format!(
                "invalid Google token file {}: {e}",
                path.display()
            ))
        })
    }

    fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn usable_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;
        match self.expires_at() {
            Some(expiry) if expiry - ChronoDuration::seconds(EXPIRY_MARGIN_SECS) <= now => None,
            _ => Some(token),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Hands out access tokens, refreshing through the token endpoint when the
/// cached one is missing or about to expire.
pub struct TokenSource {
    client: Client,
    token: Mutex<GoogleToken>,
}

impl TokenSource {
    pub fn new(client: Client, token: GoogleToken) -> ProviderResult<Self> {
        if token.token.is_none() && !token.can_refresh() {
            return Err(ProviderError::CredentialUnavailable(
                "Google token has neither an access token nor refresh credentials".into(),
            ));
        }
        Ok(Self {
            client,
            token: Mutex::new(token),
        })
    }

    pub async fn access_token(&self) -> ProviderResult<String> {
        let mut token = self.token.lock().await;
        if let Some(access) = token.usable_access_token(Utc::now()) {
            return Ok(access.to_string());
        }
        if !token.can_refresh() {
            return Err(ProviderError::CredentialUnavailable(
                "Google access token expired and no refresh credentials are configured".into(),
            ));
        }

        let form = [
            ("client_id", token.client_id.clone().unwrap_or_default()),
            ("client_secret", token.client_secret.clone().unwrap_or_default()),
            ("refresh_token", token.refresh_token.clone().unwrap_or_default()),
            ("grant_type", "refresh_token".to_string()),
        ];
        let response = self.client.post(&token.token_uri).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: "Google OAuth",
                status: status.as_u16(),
                message: sanitize_api_error(&body),
            });
        }
        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        token.token = Some(refreshed.access_token.clone());
        token.expiry = refreshed
            .expires_in
            .map(|secs| (Utc::now() + ChronoDuration::seconds(secs)).to_rfc3339());
        tracing::info!("refreshed Google access token");
        Ok(refreshed.access_token)
    }
}
