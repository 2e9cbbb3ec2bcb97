use crate::preferences::Namespace;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Outcome of running a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    /// Text placed in the tool-result message the model sees.
    pub fn to_content(&self) -> String {
        match (&self.error, self.success) {
            (Some(error), false) => format!("Error: {error}"),
            _ => self.output.clone(),
        }
    }
}

/// What the model is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Which decisions a reviewer may take on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewConfig {
    pub allow_ignore: bool,
    pub allow_respond: bool,
    pub allow_edit: bool,
    pub allow_accept: bool,
}

impl ReviewConfig {
    pub const FULL: Self = Self {
        allow_ignore: true,
        allow_respond: true,
        allow_edit: true,
        allow_accept: true,
    };

    pub const RESPOND_OR_IGNORE: Self = Self {
        allow_ignore: true,
        allow_respond: true,
        allow_edit: false,
        allow_accept: false,
    };
}

/// Kinds of consequential action that pause for a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewKind {
    SendEmail,
    ScheduleMeeting,
    Question,
}

impl ReviewKind {
    pub fn allowed(self) -> ReviewConfig {
        match self {
            Self::SendEmail | Self::ScheduleMeeting => ReviewConfig::FULL,
            Self::Question => ReviewConfig::RESPOND_OR_IGNORE,
        }
    }

    /// Preference profile that edits and feedback on this kind refine.
    pub fn namespace(self) -> Option<Namespace> {
        match self {
            Self::SendEmail => Some(Namespace::Response),
            Self::ScheduleMeeting => Some(Namespace::Calendar),
            Self::Question => None,
        }
    }
}

/// An action the agent can invoke by name.
pub trait Tool: Send + Sync {
    /// Tool name (used in LLM function calling)
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// `Some` when calls must be approved by a human before running.
    fn review_kind(&self) -> Option<ReviewKind> {
        None
    }

    /// Terminal marker: never executed, ends the agent loop.
    fn is_terminal(&self) -> bool {
        false
    }

    fn execute<'a>(
        &'a self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>>;

    /// Get the full spec for LLM registration
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}
