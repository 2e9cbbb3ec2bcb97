//! Gmail API message resource, as returned by `users.messages.get?format=full`.

use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub internal_date: Option<String>,
    #[serde(default)]
    pub payload: Option<GmailPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailPayload {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<GmailHeader>,
    #[serde(default)]
    pub body: Option<GmailBody>,
    #[serde(default)]
    pub parts: Vec<GmailPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailBody {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl GmailMessage {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload.as_ref()?.headers.iter().find_map(|h| {
            h.name
                .eq_ignore_ascii_case(name)
                .then_some(h.value.as_str())
        })
    }

    /// Effective sender: `Reply-To` when present, else `From`.
    pub fn sender(&self) -> Option<&str> {
        self.header("Reply-To")
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.header("From"))
    }

    /// Plain-text body if there is one, otherwise the HTML body.
    pub fn body_text(&self) -> Option<String> {
        let payload = self.payload.as_ref()?;
        extract_body_text(payload, "text/plain").or_else(|| extract_body_text(payload, "text/html"))
    }

    pub fn internal_date_ms(&self) -> i64 {
        self.internal_date
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0)
    }
}

fn extract_body_text(payload: &GmailPayload, target_mime: &str) -> Option<String> {
    if payload.mime_type == target_mime
        && let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref())
    {
        return decode_url_safe_base64(data);
    }
    payload
        .parts
        .iter()
        .find_map(|part| extract_body_text(part, target_mime))
}

/// Gmail uses URL-safe base64; padding is optional in practice. Bodies in
/// legacy charsets keep their text with invalid bytes replaced.
pub fn decode_url_safe_base64(data: &str) -> Option<String> {
    let trimmed = data.trim_end_matches('=');
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

pub fn encode_url_safe_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}
