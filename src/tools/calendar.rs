use super::common::{CHECK_CALENDAR, SCHEDULE_MEETING, optional_str, required_str, string_list};
use super::traits::{ReviewKind, Tool, ToolResult};
use crate::providers::{CalendarProvider, NewEvent, WorkingHours, render_schedules};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

const MEETING_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DAY_FORMAT: &str = "%d-%m-%Y";

/// Creates a calendar event and invites attendees.
pub struct ScheduleMeetingTool {
    calendar: Arc<dyn CalendarProvider>,
    organizer: String,
    timezone: String,
}

impl ScheduleMeetingTool {
    pub fn new(
        calendar: Arc<dyn CalendarProvider>,
        organizer: impl Into<String>,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            calendar,
            organizer: organizer.into(),
            timezone: timezone.into(),
        }
    }

    async fn execute_impl(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let title = required_str(&args, "title")?;
        let start_time = required_str(&args, "start_time")?;
        let end_time = required_str(&args, "end_time")?;
        let attendees = string_list(&args, "attendees");
        if attendees.is_empty() {
            return Ok(ToolResult::failed("Meeting needs at least one attendee"));
        }

        let (Ok(start), Ok(end)) = (
            NaiveDateTime::parse_from_str(start_time, MEETING_TIME_FORMAT),
            NaiveDateTime::parse_from_str(end_time, MEETING_TIME_FORMAT),
        ) else {
            return Ok(ToolResult::failed(
                "start_time and end_time must be ISO local times (YYYY-MM-DDTHH:MM:SS)",
            ));
        };
        if end <= start {
            return Ok(ToolResult::failed("end_time must be after start_time"));
        }

        let event = NewEvent {
            attendees,
            title: title.to_string(),
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            organizer_email: optional_str(&args, "organizer_email")
                .unwrap_or(&self.organizer)
                .to_string(),
            timezone: optional_str(&args, "timezone")
                .unwrap_or(&self.timezone)
                .to_string(),
        };

        match self.calendar.create_event(&event).await {
            Ok(_) => Ok(ToolResult::ok(format!(
                "Meeting '{title}' scheduled successfully from {start_time} to {end_time} with {} attendees",
                event.attendees.len()
            ))),
            Err(e) => {
                tracing::warn!(tool = SCHEDULE_MEETING, "create_event failed: {e}");
                Ok(ToolResult::failed(format!("Error scheduling meeting: {e}")))
            }
        }
    }
}

impl Tool for ScheduleMeetingTool {
    fn name(&self) -> &str {
        SCHEDULE_MEETING
    }

    fn description(&self) -> &str {
        "Schedule a meeting on the calendar and send invites to attendees."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "attendees": {"type": "array", "items": {"type": "string"}, "description": "Email addresses of attendees"},
                "title": {"type": "string", "description": "Meeting title"},
                "start_time": {"type": "string", "description": "Start time, YYYY-MM-DDTHH:MM:SS"},
                "end_time": {"type": "string", "description": "End time, YYYY-MM-DDTHH:MM:SS"},
                "organizer_email": {"type": "string", "description": "Organizer address"},
                "timezone": {"type": "string", "description": "IANA timezone of the meeting"}
            },
            "required": ["attendees", "title", "start_time", "end_time"]
        })
    }

    fn review_kind(&self) -> Option<ReviewKind> {
        Some(ReviewKind::ScheduleMeeting)
    }

    fn execute<'a>(
        &'a self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>> {
        Box::pin(self.execute_impl(args))
    }
}

/// Reports events and free working-hour slots for the requested days.
pub struct CheckCalendarTool {
    calendar: Arc<dyn CalendarProvider>,
    hours: WorkingHours,
}

impl CheckCalendarTool {
    pub fn new(calendar: Arc<dyn CalendarProvider>, hours: WorkingHours) -> Self {
        Self { calendar, hours }
    }

    async fn execute_impl(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let raw_dates = string_list(&args, "dates");
        if raw_dates.is_empty() {
            anyhow::bail!("Missing 'dates' parameter");
        }
        let mut dates = Vec::with_capacity(raw_dates.len());
        for raw in &raw_dates {
            match NaiveDate::parse_from_str(raw, DAY_FORMAT) {
                Ok(date) => dates.push(date),
                Err(_) => {
                    return Ok(ToolResult::failed(format!(
                        "Invalid date '{raw}', expected DD-MM-YYYY"
                    )));
                }
            }
        }

        match self.calendar.list_events(&dates).await {
            Ok(days) => Ok(ToolResult::ok(render_schedules(&days, self.hours))),
            Err(e) => {
                tracing::warn!(tool = CHECK_CALENDAR, "list_events failed: {e}");
                Ok(ToolResult::failed(format!("Failed to check calendar: {e}")))
            }
        }
    }
}

impl Tool for CheckCalendarTool {
    fn name(&self) -> &str {
        CHECK_CALENDAR
    }

    fn description(&self) -> &str {
        "Check calendar events and available time slots for the given days."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "dates": {"type": "array", "items": {"type": "string"}, "description": "Days to check, DD-MM-YYYY"}
            },
            "required": ["dates"]
        })
    }

    fn execute<'a>(
        &'a self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>> {
        Box::pin(self.execute_impl(args))
    }
}
