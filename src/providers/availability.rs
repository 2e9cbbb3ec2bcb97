use super::traits::{CalendarEvent, DaySchedule, EventSpan};
use chrono::NaiveTime;
use std::fmt::Write as _;

/// Daily window in which meetings may be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkingHours {
    pub fn from_hours(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start: NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(end_hour, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self::from_hours(9, 17)
    }
}

pub fn format_clock(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Free intervals inside working hours. `None` means an all-day event blocks
/// the whole day.
pub fn free_slots(
    events: &[CalendarEvent],
    hours: WorkingHours,
) -> Option<Vec<(NaiveTime, NaiveTime)>> {
    let mut busy = Vec::with_capacity(events.len());
    for event in events {
        match event.span {
            EventSpan::AllDay => return None,
            EventSpan::Timed { start, end } => busy.push((start, end)),
        }
    }
    busy.sort();

    let mut slots = Vec::new();
    let mut cursor = hours.start;
    for (start, end) in busy {
        let slot_end = start.min(hours.end);
        if cursor < slot_end {
            slots.push((cursor, slot_end));
        }
        cursor = cursor.max(end);
    }
    if cursor < hours.end {
        slots.push((cursor, hours.end));
    }
    Some(slots)
}

/// Text report handed back to the model by `check_calendar_availability`.
pub fn render_schedules(days: &[DaySchedule], hours: WorkingHours) -> String {
    let mut out = String::from("Calendar events:\n\n");
    for day in days {
        let _ = writeln!(out, "Events for {}:", day.date.format("%d-%m-%Y"));
        if day.events.is_empty() {
            out.push_str("  No events found for this day\n  Available all day\n\n");
            continue;
        }

        let mut ordered: Vec<&CalendarEvent> = day.events.iter().collect();
        ordered.sort_by_key(|event| match event.span {
            EventSpan::AllDay => NaiveTime::MIN,
            EventSpan::Timed { start, .. } => start,
        });
        for event in ordered {
            match event.span {
                EventSpan::AllDay => {
                    let _ = writeln!(out, "  - All day: {}", event.summary);
                }
                EventSpan::Timed { start, end } => {
                    let _ = writeln!(
                        out,
                        "  - {} - {}: {}",
                        format_clock(start),
                        format_clock(end),
                        event.summary
                    );
                }
            }
        }

        match free_slots(&day.events, hours) {
            None => out.push_str("  Available: No availability (all-day events)\n\n"),
            Some(slots) if slots.is_empty() => {
                out.push_str("  Available: No availability during working hours\n\n");
            }
            Some(slots) => {
                let rendered: Vec<String> = slots
                    .iter()
                    .map(|(start, end)| format!("{} - {}", format_clock(*start), format_clock(*end)))
                    .collect();
                let _ = write!(out, "  Available: {}\n\n", rendered.join(", "));
            }
        }
    }
    out
}
