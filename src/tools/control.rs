use super::common::{DONE, QUESTION};
use super::traits::{ReviewKind, Tool, ToolResult};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;

/// Asks the user a follow-up question. Answered through review, never run.
pub struct QuestionTool;

impl Tool for QuestionTool {
    fn name(&self) -> &str {
        QUESTION
    }

    fn description(&self) -> &str {
        "Ask the user any follow-up questions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "content": {"type": "string", "description": "The question to ask"}
            },
            "required": ["content"]
        })
    }

    fn review_kind(&self) -> Option<ReviewKind> {
        Some(ReviewKind::Question)
    }

    fn execute<'a>(
        &'a self,
        _args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>> {
        Box::pin(async { Ok(ToolResult::failed("Questions are answered by the user through review")) })
    }
}

/// Signals that the email has been dealt with.
pub struct DoneTool;

impl Tool for DoneTool {
    fn name(&self) -> &str {
        DONE
    }

    fn description(&self) -> &str {
        "E-mail has been sent."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "done": {"type": "boolean"}
            },
            "required": ["done"]
        })
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn execute<'a>(
        &'a self,
        _args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>> {
        Box::pin(async { Ok(ToolResult::ok("Done")) })
    }
}
