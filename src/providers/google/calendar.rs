use super::auth::TokenSource;
use super::decode_json;
use super::retry::{RetryPolicy, send_with_retry};
use crate::providers::error::ProviderResult;
use crate::providers::traits::{
    CalendarEvent, CalendarProvider, DaySchedule, EventSpan, NewEvent,
};
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

const PROVIDER: &str = "Google Calendar";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    start: EventTime,
    #[serde(default)]
    end: EventTime,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertResponse {
    id: String,
    #[serde(default)]
    html_link: Option<String>,
}

impl EventItem {
    fn into_event(self) -> Option<CalendarEvent> {
        let summary = self.summary.unwrap_or_else(|| "(no title)".to_string());
        let span = match (self.start.date_time, self.end.date_time) {
            (Some(start), Some(end)) => {
                let start = DateTime::parse_from_rfc3339(&start).ok()?;
                let end = DateTime::parse_from_rfc3339(&end).ok()?;
                EventSpan::Timed {
                    start: start.time(),
                    end: end.time(),
                }
            }
            _ if self.start.date.is_some() => EventSpan::AllDay,
            _ => return None,
        };
        Some(CalendarEvent { summary, span })
    }
}

/// Google Calendar v3 client operating on the primary calendar.
pub struct GoogleCalendarClient {
    http: Client,
    api_base: String,
    tokens: Arc<TokenSource>,
    retry: RetryPolicy,
}

impl GoogleCalendarClient {
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

    fn events_url(&self) -> String {
        format!("{}/calendar/v3/calendars/primary/events", self.api_base)
    }

    async fn day_schedule(&self, date: NaiveDate, token: &str) -> ProviderResult<DaySchedule> {
        let url = self.events_url();
        let day = date.format("%Y-%m-%d").to_string();
        let time_min = format!("{day}T00:00:00Z");
        let time_max = format!("{day}T23:59:59Z");
        let response = send_with_retry(self.retry, PROVIDER, || {
            self.http.get(&url).bearer_auth(token).query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
        })
        .await?;
        let events: EventsResponse = decode_json(PROVIDER, response).await?;
        Ok(DaySchedule {
            date,
            events: events
                .items
                .into_iter()
                .filter_map(EventItem::into_event)
                .collect(),
        })
    }

    async fn list_events_impl(&self, dates: &[NaiveDate]) -> ProviderResult<Vec<DaySchedule>> {
        let token = self.tokens.access_token().await?;
        let mut days = Vec::with_capacity(dates.len());
        for date in dates {
            days.push(self.day_schedule(*date, &token).await?);
        }
        Ok(days)
    }

    async fn create_event_impl(&self, event: &NewEvent) -> ProviderResult<String> {
        let token = self.tokens.access_token().await?;
        let body = json!({
            "summary": event.title,
            "start": {"dateTime": event.start_time, "timeZone": event.timezone},
            "end": {"dateTime": event.end_time, "timeZone": event.timezone},
            "attendees": event.attendees.iter().map(|email| json!({"email": email})).collect::<Vec<_>>(),
            "organizer": {"email": event.organizer_email, "self": true},
            "reminders": {"useDefault": true},
        });
        let url = self.events_url();
        let response = send_with_retry(self.retry, PROVIDER, || {
            self.http
                .post(&url)
                .bearer_auth(&token)
                .query(&[("sendUpdates", "all")])
                .json(&body)
        })
        .await?;
        let created: InsertResponse = decode_json(PROVIDER, response).await?;
        tracing::info!(event_id = %created.id, title = %event.title, "meeting created");
        Ok(created.html_link.unwrap_or(created.id))
    }
}

impl CalendarProvider for GoogleCalendarClient {
    fn name(&self) -> &str {
        "google"
    }

    fn list_events<'a>(
        &'a self,
        dates: &'a [NaiveDate],
    ) -> Pin<Box<dyn Future<Output = ProviderResult<Vec<DaySchedule>>> + Send + 'a>> {
        Box::pin(self.list_events_impl(dates))
    }

    fn create_event<'a>(
        &'a self,
        event: &'a NewEvent,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<String>> + Send + 'a>> {
        Box::pin(self.create_event_impl(event))
    }
}

#[cfg(test)]
mod tests {
    use super::GoogleCalendarClient;
    use crate::providers::google::{GoogleToken, RetryPolicy, TokenSource};
    use crate::providers::traits::{CalendarProvider, EventSpan, NewEvent};
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoogleCalendarClient {
        let token = GoogleToken {
            token: Some("ya29.test".into()),
            ..GoogleToken::default()
        };
        let tokens = Arc::new(TokenSource::new(reqwest::Client::new(), token).unwrap());
        GoogleCalendarClient::new(reqwest::Client::new(), &server.uri(), tokens)
            .with_retry(RetryPolicy::none())
    }

    #[tokio::test]
    async fn lists_timed_and_all_day_events() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendar/v3/calendars/primary/events"))
            .and(query_param("timeMin", "2025-05-22T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"summary": "Standup",
                     "start": {"dateTime": "2025-05-22T09:30:00-07:00"},
                     "end": {"dateTime": "2025-05-22T09:45:00-07:00"}},
                    {"summary": "Holiday",
                     "start": {"date": "2025-05-22"},
                     "end": {"date": "2025-05-23"}}
                ]
            })))
            .mount(&server)
            .await;

        let date = NaiveDate::from_ymd_opt(2025, 5, 22).unwrap();
        let days = client(&server).list_events(&[date]).await.unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].events.len(), 2);
        assert_eq!(
            days[0].events[0].span,
            EventSpan::Timed {
                start: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                end: NaiveTime::from_hms_opt(9, 45, 0).unwrap(),
            }
        );
        assert_eq!(days[0].events[1].span, EventSpan::AllDay);
    }

    #[tokio::test]
    async fn create_event_sends_invites() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendar/v3/calendars/primary/events"))
            .and(query_param("sendUpdates", "all"))
            .and(body_partial_json(json!({
                "summary": "Tax planning",
                "attendees": [{"email": "pm@client.com"}],
                "start": {"timeZone": "America/Los_Angeles"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "evt1", "htmlLink": "https://calendar.google.com/evt1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let link = client(&server)
            .create_event(&NewEvent {
                attendees: vec!["pm@client.com".into()],
                title: "Tax planning".into(),
                start_time: "2025-05-22T14:00:00".into(),
                end_time: "2025-05-22T14:45:00".into(),
                organizer_email: "lance@company.com".into(),
                timezone: "America/Los_Angeles".into(),
            })
            .await
            .unwrap();
        assert_eq!(link, "https://calendar.google.com/evt1");
    }
}
