use super::availability::WorkingHours;
use super::google::{GmailClient, GoogleCalendarClient, GoogleToken, TokenSource, build_http_client};
use super::simulated::{SimulatedCalendar, SimulatedMail};
use super::traits::{CalendarProvider, MailProvider};
use crate::config::Config;
use std::sync::Arc;

/// Mail and calendar collaborators shared by the tools and the ingestion job.
#[derive(Clone)]
pub struct Collaborators {
    pub mail: Arc<dyn MailProvider>,
    pub calendar: Arc<dyn CalendarProvider>,
    pub working_hours: WorkingHours,
}

impl Collaborators {
    pub fn simulated() -> Self {
        Self {
            mail: Arc::new(SimulatedMail::new()),
            calendar: Arc::new(SimulatedCalendar::new()),
            working_hours: WorkingHours::default(),
        }
    }
}

fn google_tokens(config: &Config) -> Option<Arc<TokenSource>> {
    let loaded = GoogleToken::load(config.mail.token_json.as_deref(), &config.mail.token_path)
        .and_then(|token| TokenSource::new(build_http_client(), token));
    match loaded {
        Ok(source) => Some(Arc::new(source)),
        Err(e) => {
            tracing::warn!("Google credentials unavailable, using simulated mail/calendar: {e}");
            None
        }
    }
}

/// Build the configured collaborators. Google-backed ones degrade to the
/// simulated implementations when no usable token is found.
pub fn create_collaborators(config: &Config) -> Collaborators {
    let wants_google = config.mail.provider == "gmail" || config.calendar.provider == "google";
    let tokens = if wants_google { google_tokens(config) } else { None };

    let mail: Arc<dyn MailProvider> = match (&tokens, config.mail.provider.as_str()) {
        (Some(tokens), "gmail") => Arc::new(GmailClient::new(
            build_http_client(),
            &config.mail.api_base,
            Arc::clone(tokens),
        )),
        _ => Arc::new(SimulatedMail::new()),
    };
    let calendar: Arc<dyn CalendarProvider> = match (&tokens, config.calendar.provider.as_str()) {
        (Some(tokens), "google") => Arc::new(GoogleCalendarClient::new(
            build_http_client(),
            &config.calendar.api_base,
            Arc::clone(tokens),
        )),
        _ => Arc::new(SimulatedCalendar::new()),
    };
    tracing::info!(mail = mail.name(), calendar = calendar.name(), "collaborators ready");

    Collaborators {
        mail,
        calendar,
        working_hours: WorkingHours::from_hours(
            config.calendar.work_start_hour,
            config.calendar.work_end_hour,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::create_collaborators;
    use crate::config::Config;

    #[test]
    fn missing_token_degrades_to_simulated() {
        let mut config = Config::default();
        config.mail.token_path = "/nonexistent/google_token.json".into();
        config.mail.token_json = None;
        let collaborators = create_collaborators(&config);
        assert_eq!(collaborators.mail.name(), "simulated");
        assert_eq!(collaborators.calendar.name(), "simulated");
    }

    #[test]
    fn inline_token_selects_google_clients() {
        let mut config = Config::default();
        config.mail.token_json = Some(r#"{"token": "ya29.inline"}"#.into());
        let collaborators = create_collaborators(&config);
        assert_eq!(collaborators.mail.name(), "gmail");
        assert_eq!(collaborators.calendar.name(), "google");
    }

    #[test]
    fn simulated_provider_config_skips_google() {
        let mut config = Config::default();
        config.mail.provider = "simulated".into();
        config.calendar.provider = "simulated".into();
        config.mail.token_json = Some(r#"{"token": "ya29.inline"}"#.into());
        let collaborators = create_collaborators(&config);
        assert_eq!(collaborators.mail.name(), "simulated");
    }
}
