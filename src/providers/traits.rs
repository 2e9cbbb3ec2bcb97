use super::error::ProviderResult;
use crate::email::Envelope;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Mailbox query used by the ingestion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFilter {
    pub email_address: String,
    pub minutes_since: u32,
    pub include_read: bool,
}

impl FetchFilter {
    /// Gmail search expression for this filter, relative to `now_unix`.
    pub fn search_query(&self, now_unix: i64) -> String {
        let after = now_unix - i64::from(self.minutes_since) * 60;
        let mut query = format!(
            "(to:{address} OR from:{address}) after:{after}",
            address = self.email_address
        );
        if !self.include_read {
            query.push_str(" is:unread");
        }
        query
    }
}

/// One mailbox message, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedMessage {
    pub id: String,
    pub thread_id: String,
    /// Raw `From` header; the envelope author may come from `Reply-To`.
    pub from_header: String,
    pub envelope: Envelope,
}

/// A message matched by a fetch, with its whole thread in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailItem {
    pub message: FetchedMessage,
    pub thread: Vec<FetchedMessage>,
}

impl MailItem {
    pub fn latest_in_thread(&self) -> &FetchedMessage {
        self.thread.last().unwrap_or(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    /// Message being replied to; `None` starts a new conversation.
    pub reply_to_id: Option<String>,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub from: String,
    #[serde(default)]
    pub cc: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSpan {
    Timed { start: NaiveTime, end: NaiveTime },
    AllDay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub span: EventSpan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub attendees: Vec<String>,
    pub title: String,
    /// ISO local date-time, `YYYY-MM-DDTHH:MM:SS`.
    pub start_time: String,
    pub end_time: String,
    pub organizer_email: String,
    pub timezone: String,
}

pub trait MailProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch<'a>(
        &'a self,
        filter: &'a FetchFilter,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<Vec<MailItem>>> + Send + 'a>>;

    /// Send a message; returns the provider's id for it.
    fn send<'a>(
        &'a self,
        email: &'a OutgoingEmail,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<String>> + Send + 'a>>;

    fn mark_handled<'a>(
        &'a self,
        message_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<()>> + Send + 'a>>;
}

pub trait CalendarProvider: Send + Sync {
    fn name(&self) -> &str;

    fn list_events<'a>(
        &'a self,
        dates: &'a [NaiveDate],
    ) -> Pin<Box<dyn Future<Output = ProviderResult<Vec<DaySchedule>>> + Send + 'a>>;

    /// Create the event and invite attendees; returns a link or id.
    fn create_event<'a>(
        &'a self,
        event: &'a NewEvent,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<String>> + Send + 'a>>;
}
