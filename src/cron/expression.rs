use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;

/// Validate `expression` and return its first occurrence after `from`.
pub fn next_run_for(expression: &str, from: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let normalized = normalize_expression(expression)?;
    let schedule = Schedule::from_str(&normalized)
        .with_context(|| format!("Invalid cron expression: {expression}"))?;
    schedule
        .after(&from)
        .next()
        .ok_or_else(|| anyhow::anyhow!("No future occurrence for expression: {expression}"))
}

fn normalize_expression(expression: &str) -> Result<String> {
    let expression = expression.trim();
    let field_count = expression.split_whitespace().count();

    match field_count {
        // standard crontab syntax: minute hour day month weekday
        5 => Ok(format!("0 {expression}")),
        // crate-native syntax includes seconds (+ optional year)
        6 | 7 => Ok(expression.to_string()),
        _ => anyhow::bail!(
            "Invalid cron expression: {expression} (expected 5, 6, or 7 fields, got {field_count})"
        ),
    }
}

pub(crate) fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid RFC3339 timestamp in cron table: {raw}"))?;
    Ok(parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::{next_run_for, normalize_expression, parse_rfc3339};
    use chrono::{TimeZone, Timelike, Utc};

    #[test]
    fn five_field_crontab_gets_seconds_prefix() {
        assert_eq!(normalize_expression("*/10 * * * *").unwrap(), "0 */10 * * * *");
        assert_eq!(normalize_expression(" 0 0 9 * * * ").unwrap(), "0 0 9 * * *");
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = normalize_expression("* * *").unwrap_err();
        assert!(err.to_string().contains("got 3"));
        assert!(next_run_for("not a cron", Utc::now()).is_err());
    }

    #[test]
    fn next_run_is_strictly_after_from() {
        let from = Utc.with_ymd_and_hms(2025, 3, 1, 8, 59, 30).unwrap();
        let next = next_run_for("0 9 * * *", from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());

        let every_ten = next_run_for("*/10 * * * *", from).unwrap();
        assert_eq!(every_ten.minute() % 10, 0);
        assert!(every_ten > from);
    }

    #[test]
    fn parses_stored_timestamps() {
        let parsed = parse_rfc3339("2025-03-01T09:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 1, 7, 0, 0).unwrap());
        assert!(parse_rfc3339("yesterday").is_err());
    }
}
