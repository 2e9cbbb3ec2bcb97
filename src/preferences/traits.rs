use crate::prompt::{
    DEFAULT_CALENDAR_PREFERENCES, DEFAULT_RESPONSE_PREFERENCES, DEFAULT_TRIAGE_INSTRUCTIONS,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Concern area a preference profile belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Namespace {
    Triage,
    Response,
    Calendar,
}

impl Namespace {
    /// Label the merge prompt uses to name the profile being updated.
    pub fn label(self) -> &'static str {
        match self {
            Self::Triage => "triage_preferences",
            Self::Response => "response_preferences",
            Self::Calendar => "cal_preferences",
        }
    }

    pub fn default_profile(self) -> &'static str {
        match self {
            Self::Triage => DEFAULT_TRIAGE_INSTRUCTIONS,
            Self::Response => DEFAULT_RESPONSE_PREFERENCES,
            Self::Calendar => DEFAULT_CALENDAR_PREFERENCES,
        }
    }
}

/// One accepted replacement of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRevision {
    pub namespace: Namespace,
    pub profile: String,
    pub rationale: String,
    pub recorded_at: String,
}

/// Durable per-namespace profile storage. Every write replaces the whole
/// profile atomically; there are no partial updates.
pub trait PreferenceStore: Send + Sync {
    fn name(&self) -> &str;

    fn get<'a>(
        &'a self,
        namespace: Namespace,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>>;

    /// Store `profile` unless the namespace already has one; returns the
    /// value that is stored afterwards.
    fn insert_if_absent<'a>(
        &'a self,
        namespace: Namespace,
        profile: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;

    fn replace<'a>(
        &'a self,
        namespace: Namespace,
        profile: &'a str,
        rationale: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

    /// Most recent revisions first.
    fn history<'a>(
        &'a self,
        namespace: Namespace,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<PreferenceRevision>>> + Send + 'a>>;
}
