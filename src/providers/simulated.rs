//! Stand-ins used when no Google credentials are available. They log what
//! would have happened and keep a record of every call.

use super::error::{ProviderError, ProviderResult};
use super::traits::{
    CalendarEvent, CalendarProvider, DaySchedule, EventSpan, FetchFilter, FetchedMessage,
    MailItem, MailProvider, NewEvent, OutgoingEmail,
};
use crate::email::Envelope;
use chrono::{NaiveDate, NaiveTime};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

const MOCK_MESSAGE_ID: &str = "mock-email-id-123";
const MOCK_THREAD_ID: &str = "mock-thread-id-123";

fn outage_error(outage: &Mutex<Option<u16>>) -> ProviderResult<()> {
    match *outage.lock().unwrap_or_else(PoisonError::into_inner) {
        Some(status) => Err(ProviderError::Api {
            provider: "simulated",
            status,
            message: "service unavailable".into(),
        }),
        None => Ok(()),
    }
}

#[derive(Default)]
pub struct SimulatedMail {
    sent: Mutex<Vec<OutgoingEmail>>,
    handled: Mutex<Vec<String>>,
    outage: Mutex<Option<u16>>,
}

impl SimulatedMail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn handled(&self) -> Vec<String> {
        self.handled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make every send fail with `status` until cleared with `None`.
    pub fn set_outage(&self, status: Option<u16>) {
        *self.outage.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }
}

impl MailProvider for SimulatedMail {
    fn name(&self) -> &str {
        "simulated"
    }

    fn fetch<'a>(
        &'a self,
        filter: &'a FetchFilter,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<Vec<MailItem>>> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(address = %filter.email_address, "simulated mailbox returns one sample email");
            let message = FetchedMessage {
                id: MOCK_MESSAGE_ID.into(),
                thread_id: MOCK_THREAD_ID.into(),
                from_header: "sender@example.com".into(),
                envelope: Envelope::new(
                    "sender@example.com",
                    filter.email_address.clone(),
                    "Sample Email Subject",
                    "This is a sample email body for testing the email assistant.",
                )
                .with_source_id(MOCK_MESSAGE_ID),
            };
            Ok(vec![MailItem {
                thread: vec![message.clone()],
                message,
            }])
        })
    }

    fn send<'a>(
        &'a self,
        email: &'a OutgoingEmail,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<String>> + Send + 'a>> {
        Box::pin(async move {
            outage_error(&self.outage)?;
            let preview: String = email.body.chars().take(100).collect();
            tracing::info!(to = %email.to, subject = %email.subject, "simulated send: {preview}");
            let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
            sent.push(email.clone());
            Ok(format!("simulated-{}", sent.len()))
        })
    }

    fn mark_handled<'a>(
        &'a self,
        message_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<()>> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(message_id, "simulated mark-as-read");
            self.handled
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message_id.to_string());
            Ok(())
        })
    }
}

#[derive(Default)]
pub struct SimulatedCalendar {
    created: Mutex<Vec<NewEvent>>,
    outage: Mutex<Option<u16>>,
}

impl SimulatedCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<NewEvent> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make every invite fail with `status` until cleared with `None`.
    pub fn set_outage(&self, status: Option<u16>) {
        *self.outage.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }
}

fn canned_day(date: NaiveDate) -> DaySchedule {
    let at = |hour| NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    DaySchedule {
        date,
        events: vec![
            CalendarEvent {
                summary: "Team Meeting".into(),
                span: EventSpan::Timed {
                    start: at(9),
                    end: at(10),
                },
            },
            CalendarEvent {
                summary: "Project Review".into(),
                span: EventSpan::Timed {
                    start: at(14),
                    end: at(15),
                },
            },
        ],
    }
}

impl CalendarProvider for SimulatedCalendar {
    fn name(&self) -> &str {
        "simulated"
    }

    fn list_events<'a>(
        &'a self,
        dates: &'a [NaiveDate],
    ) -> Pin<Box<dyn Future<Output = ProviderResult<Vec<DaySchedule>>> + Send + 'a>> {
        Box::pin(async move { Ok(dates.iter().copied().map(canned_day).collect()) })
    }

    fn create_event<'a>(
        &'a self,
        event: &'a NewEvent,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<String>> + Send + 'a>> {
        Box::pin(async move {
            outage_error(&self.outage)?;
            tracing::info!(
                title = %event.title,
                start = %event.start_time,
                end = %event.end_time,
                attendees = %event.attendees.join(", "),
                "simulated calendar invite"
            );
            let mut created = self.created.lock().unwrap_or_else(PoisonError::into_inner);
            created.push(event.clone());
            Ok(format!("simulated-event-{}", created.len()))
        })
    }
}
