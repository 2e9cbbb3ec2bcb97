use serde::{Deserialize, Serialize};

/// Canonical view of one email, independent of where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub author: String,
    pub recipient: String,
    pub subject: String,
    pub thread_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl Envelope {
    pub fn new(
        author: impl Into<String>,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        thread_text: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            recipient: recipient.into(),
            subject: subject.into(),
            thread_text: thread_text.into(),
            source_id: None,
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Bare address out of a `Name <addr>` header value.
    pub fn author_address(&self) -> &str {
        extract_address(&self.author)
    }
}

pub fn extract_address(header_value: &str) -> &str {
    match (header_value.rfind('<'), header_value.rfind('>')) {
        (Some(start), Some(end)) if start < end => header_value[start + 1..end].trim(),
        _ => header_value.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Envelope, extract_address};

    #[test]
    fn extracts_bracketed_address() {
        assert_eq!(
            extract_address("Alice Smith <alice.smith@company.com>"),
            "alice.smith@company.com"
        );
        assert_eq!(extract_address(" bob@example.com "), "bob@example.com");
    }

    #[test]
    fn source_id_is_optional_in_json() {
        let envelope = Envelope::new("a", "b", "c", "d");
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("source_id").is_none());
        let with_id = envelope.with_source_id("msg-1");
        assert_eq!(with_id.source_id.as_deref(), Some("msg-1"));
    }
}
