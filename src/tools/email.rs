use super::common::{WRITE_EMAIL, optional_str, required_str, string_list};
use super::traits::{ReviewKind, Tool, ToolResult};
use crate::providers::{MailProvider, OutgoingEmail};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Sends a reply (or a new email) through the mail provider.
pub struct WriteEmailTool {
    mail: Arc<dyn MailProvider>,
    sender: String,
}

impl WriteEmailTool {
    pub fn new(mail: Arc<dyn MailProvider>, sender: impl Into<String>) -> Self {
        Self {
            mail,
            sender: sender.into(),
        }
    }

    async fn execute_impl(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let to = required_str(&args, "to")?;
        let subject = required_str(&args, "subject")?;
        let content = required_str(&args, "content")?;
        let reply_to_id = optional_str(&args, "reply_to_id").map(str::to_string);

        let email = OutgoingEmail {
            reply_to_id: reply_to_id.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: content.to_string(),
            from: self.sender.clone(),
            cc: string_list(&args, "cc"),
        };

        match self.mail.send(&email).await {
            Ok(_) => Ok(ToolResult::ok(match reply_to_id {
                Some(id) => format!("Email reply sent successfully to message ID: {id}"),
                None => format!("Email sent to {to} with subject '{subject}'"),
            })),
            Err(e) => {
                tracing::warn!(tool = WRITE_EMAIL, "send failed: {e}");
                Ok(ToolResult::failed(format!("Failed to send email: {e}")))
            }
        }
    }
}

impl Tool for WriteEmailTool {
    fn name(&self) -> &str {
        WRITE_EMAIL
    }

    fn description(&self) -> &str {
        "Write and send an email. Pass reply_to_id (the ID of the email being answered) to reply in its thread."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "to": {"type": "string", "description": "Recipient email address"},
                "subject": {"type": "string", "description": "Email subject"},
                "content": {"type": "string", "description": "Email body"},
                "reply_to_id": {"type": "string", "description": "ID of the message being replied to"},
                "cc": {"type": "array", "items": {"type": "string"}, "description": "Additional recipients"}
            },
            "required": ["to", "subject", "content"]
        })
    }

    fn review_kind(&self) -> Option<ReviewKind> {
        Some(ReviewKind::SendEmail)
    }

    fn execute<'a>(
        &'a self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>> {
        Box::pin(self.execute_impl(args))
    }
}
