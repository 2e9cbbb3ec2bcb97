use super::envelope::Envelope;
use crate::llm::ToolCall;
use serde_json::Value;

const HTML_WRAP_WIDTH: usize = 100;

pub fn looks_like_html(text: &str) -> bool {
    let head = text.trim_start();
    head.starts_with("<!DOCTYPE") || head.starts_with("<html") || text.contains("<body")
}

/// Convert HTML thread text to plain text. Non-HTML input and conversion
/// failures pass through unchanged.
pub fn thread_to_plain_text(text: &str) -> String {
    if !looks_like_html(text) {
        return text.to_string();
    }
    match html2text::from_read(text.as_bytes(), HTML_WRAP_WIDTH) {
        Ok(converted) => converted,
        Err(e) => {
            tracing::debug!("HTML thread conversion failed, using raw text: {e}");
            text.to_string()
        }
    }
}

/// Markdown block describing an email, as shown to the model and reviewer.
pub fn format_email_markdown(envelope: &Envelope) -> String {
    let id_line = envelope
        .source_id
        .as_deref()
        .map(|id| format!("\n**ID**: {id}"))
        .unwrap_or_default();
    format!(
        "\n\n**Subject**: {}\n**From**: {}\n**To**: {}{}\n\n{}\n\n---\n",
        envelope.subject,
        envelope.author,
        envelope.recipient,
        id_line,
        thread_to_plain_text(&envelope.thread_text)
    )
}

fn arg_str<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn arg_list(args: &Value, key: &str) -> String {
    match args.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_string))
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::String(single)) => single.clone(),
        _ => String::new(),
    }
}

/// Human-readable rendering of a proposed tool call for the review channel.
pub fn format_for_display(call: &ToolCall) -> String {
    let args = &call.input;
    match call.name.as_str() {
        "write_email" => format!(
            "# Email Draft\n\n**To**: {}\n**Subject**: {}\n\n{}",
            arg_str(args, "to"),
            arg_str(args, "subject"),
            arg_str(args, "content")
        ),
        "schedule_meeting" => format!(
            "# Calendar Invite\n\n**Meeting**: {}\n**Attendees**: {}\n**Start**: {}\n**End**: {}\n",
            arg_str(args, "title"),
            arg_list(args, "attendees"),
            arg_str(args, "start_time"),
            arg_str(args, "end_time")
        ),
        "Question" => format!("# Question for User\n\n{}", arg_str(args, "content")),
        other => format!(
            "# Tool Call: {other}\n\nArguments:\n{}",
            serde_json::to_string_pretty(args).unwrap_or_else(|_| args.to_string())
        ),
    }
}
