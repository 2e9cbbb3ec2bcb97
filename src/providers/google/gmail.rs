use super::auth::TokenSource;
use super::retry::{RetryPolicy, send_with_retry};
use super::{decode_json, ensure_success};
use crate::email::gmail::{GmailMessage, encode_url_safe_base64};
use crate::email::parse::from_gmail_message;
use crate::providers::error::{ProviderError, ProviderResult};
use crate::providers::traits::{FetchFilter, FetchedMessage, MailItem, MailProvider, OutgoingEmail};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

const PROVIDER: &str = "Gmail";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRef {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    #[serde(default)]
    messages: Vec<GmailMessage>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// Gmail REST client (`gmail/v1/users/me`).
pub struct GmailClient {
    http: Client,
    api_base: String,
    tokens: Arc<TokenSource>,
    retry: RetryPolicy,
}

impl GmailClient {
    pub fn new(http: Client, api_base: &str, tokens: Arc<TokenSource>) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            tokens,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/gmail/v1/users/me/{suffix}", self.api_base)
    }

    async fn list_message_ids(&self, query: &str) -> ProviderResult<Vec<String>> {
        let url = self.url("messages");
        let token = self.tokens.access_token().await?;
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let response = send_with_retry(self.retry, PROVIDER, || {
                let mut request = self.http.get(&url).bearer_auth(&token).query(&[("q", query)]);
                if let Some(page) = page_token.as_deref() {
                    request = request.query(&[("pageToken", page)]);
                }
                request
            })
            .await?;
            let page: ListResponse = decode_json(PROVIDER, response).await?;
            tracing::debug!(count = page.messages.len(), "Gmail list page");
            ids.extend(page.messages.into_iter().map(|m| m.id));
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        Ok(ids)
    }

    async fn get_message(&self, id: &str) -> ProviderResult<GmailMessage> {
        let url = self.url(&format!("messages/{id}"));
        let token = self.tokens.access_token().await?;
        let response = send_with_retry(self.retry, PROVIDER, || {
            self.http
                .get(&url)
                .bearer_auth(&token)
                .query(&[("format", "full")])
        })
        .await?;
        decode_json(PROVIDER, response).await
    }

    /// Thread messages sorted oldest first.
    async fn get_thread(&self, thread_id: &str) -> ProviderResult<Vec<GmailMessage>> {
        let url = self.url(&format!("threads/{thread_id}"));
        let token = self.tokens.access_token().await?;
        let response = send_with_retry(self.retry, PROVIDER, || {
            self.http
                .get(&url)
                .bearer_auth(&token)
                .query(&[("format", "full")])
        })
        .await?;
        let thread: ThreadResponse = decode_json(PROVIDER, response).await?;
        let mut messages = thread.messages;
        if messages.iter().all(|m| m.internal_date.is_some()) {
            messages.sort_by_key(GmailMessage::internal_date_ms);
        } else {
            messages.sort_by(|a, b| a.id.cmp(&b.id));
        }
        Ok(messages)
    }

    async fn fetch_item(&self, id: &str) -> ProviderResult<MailItem> {
        let message = self.get_message(id).await?;
        let thread = self.get_thread(&message.thread_id).await?;
        let thread = thread
            .iter()
            .map(to_fetched)
            .collect::<ProviderResult<Vec<_>>>()?;
        Ok(MailItem {
            message: to_fetched(&message)?,
            thread,
        })
    }

    async fn fetch_impl(&self, filter: &FetchFilter) -> ProviderResult<Vec<MailItem>> {
        let query = filter.search_query(Utc::now().timestamp());
        tracing::info!(%query, "searching Gmail");
        let ids = self.list_message_ids(&query).await?;

        let mut items = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.fetch_item(id).await {
                Ok(item) => items.push(item),
                Err(ProviderError::CredentialUnavailable(reason)) => {
                    return Err(ProviderError::CredentialUnavailable(reason));
                }
                Err(e) => tracing::warn!(message_id = %id, "skipping message: {e}"),
            }
        }
        tracing::info!(matched = ids.len(), fetched = items.len(), "Gmail fetch complete");
        Ok(items)
    }

    async fn send_impl(&self, email: &OutgoingEmail) -> ProviderResult<String> {
        let mut subject = email.subject.clone();
        let mut to = email.to.clone();
        let mut thread_id = None;

        if let Some(reply_to) = email.reply_to_id.as_deref() {
            match self.get_message(reply_to).await {
                Ok(original) => {
                    let original_subject = original.header("Subject").unwrap_or(&email.subject);
                    subject = reply_subject(original_subject);
                    if to.trim().is_empty() {
                        to = original.sender().unwrap_or_default().to_string();
                    }
                    thread_id = Some(original.thread_id.clone()).filter(|t| !t.is_empty());
                }
                Err(e) => {
                    tracing::warn!(message_id = reply_to, "could not load original message, sending as new: {e}");
                }
            }
        }

        let raw = build_raw_message(&email.from, &to, &subject, &email.cc, &email.body);
        let mut body = json!({ "raw": encode_url_safe_base64(raw.as_bytes()) });
        if let Some(thread_id) = thread_id {
            body["threadId"] = json!(thread_id);
        }

        let url = self.url("messages/send");
        let token = self.tokens.access_token().await?;
        let response = send_with_retry(self.retry, PROVIDER, || {
            self.http.post(&url).bearer_auth(&token).json(&body)
        })
        .await?;
        let sent: SendResponse = decode_json(PROVIDER, response).await?;
        tracing::info!(message_id = %sent.id, "email sent");
        Ok(sent.id)
    }

    async fn mark_handled_impl(&self, message_id: &str) -> ProviderResult<()> {
        let url = self.url(&format!("messages/{message_id}/modify"));
        let token = self.tokens.access_token().await?;
        let body = json!({ "removeLabelIds": ["UNREAD"] });
        let response = send_with_retry(self.retry, PROVIDER, || {
            self.http.post(&url).bearer_auth(&token).json(&body)
        })
        .await?;
        ensure_success(PROVIDER, response).await?;
        tracing::info!(message_id, "marked message as read");
        Ok(())
    }
}

fn to_fetched(message: &GmailMessage) -> ProviderResult<FetchedMessage> {
    let envelope = from_gmail_message(message).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(FetchedMessage {
        id: message.id.clone(),
        thread_id: message.thread_id.clone(),
        from_header: message.header("From").unwrap_or_default().to_string(),
        envelope,
    })
}

pub fn reply_subject(subject: &str) -> String {
    if subject.starts_with("Re:") {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// RFC 5322 text/plain message.
pub fn build_raw_message(from: &str, to: &str, subject: &str, cc: &[String], body: &str) -> String {
    let mut raw = format!(
        "To: {}\r\nFrom: {}\r\nSubject: {}\r\n",
        header_value(to),
        header_value(from),
        header_value(subject)
    );
    if !cc.is_empty() {
        raw.push_str(&format!("Cc: {}\r\n", header_value(&cc.join(", "))));
    }
    raw.push_str("MIME-Version: 1.0\r\nContent-Type: text/plain; charset=\"utf-8\"\r\n\r\n");
    raw.push_str(body);
    raw
}

impl MailProvider for GmailClient {
    fn name(&self) -> &str {
        "gmail"
    }

    fn fetch<'a>(
        &'a self,
        filter: &'a FetchFilter,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<Vec<MailItem>>> + Send + 'a>> {
        Box::pin(self.fetch_impl(filter))
    }

    fn send<'a>(
        &'a self,
        email: &'a OutgoingEmail,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<String>> + Send + 'a>> {
        Box::pin(self.send_impl(email))
    }

    fn mark_handled<'a>(
        &'a self,
        message_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<()>> + Send + 'a>> {
        Box::pin(self.mark_handled_impl(message_id))
    }
}
