use super::envelope::Envelope;
use super::gmail::GmailMessage;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("email input must be a JSON object")]
    NotAnObject,
    #[error("unrecognized email input format (keys: {0})")]
    UnrecognizedFormat(String),
    #[error("email input is missing field '{0}'")]
    MissingField(&'static str),
    #[error("field '{0}' must be a string")]
    InvalidField(&'static str),
    #[error("Gmail message could not be decoded: {0}")]
    Decode(String),
}

/// Which of the accepted raw shapes an input matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// `{author, to, subject, email_thread}`
    Dataset,
    /// `{from, to, subject, body, id}`
    Ingest,
    /// Raw Gmail API message with `payload.headers`
    Gmail,
}

pub fn detect_format(raw: &Value) -> Result<InputFormat, EnvelopeError> {
    let object = raw.as_object().ok_or(EnvelopeError::NotAnObject)?;
    if object.contains_key("payload") {
        Ok(InputFormat::Gmail)
    } else if object.contains_key("email_thread") || object.contains_key("author") {
        Ok(InputFormat::Dataset)
    } else if object.contains_key("body") || object.contains_key("from") {
        Ok(InputFormat::Ingest)
    } else {
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        Err(EnvelopeError::UnrecognizedFormat(keys.join(", ")))
    }
}

/// Normalize any accepted raw email into an [`Envelope`].
pub fn parse_envelope(raw: &Value) -> Result<Envelope, EnvelopeError> {
    match detect_format(raw)? {
        InputFormat::Dataset => Ok(Envelope {
            author: required(raw, "author")?,
            recipient: required(raw, "to")?,
            subject: required(raw, "subject")?,
            thread_text: required(raw, "email_thread")?,
            source_id: optional(raw, "id")?,
        }),
        InputFormat::Ingest => Ok(Envelope {
            author: required(raw, "from")?,
            recipient: required(raw, "to")?,
            subject: optional(raw, "subject")?.unwrap_or_default(),
            thread_text: optional(raw, "body")?.unwrap_or_default(),
            source_id: optional(raw, "id")?,
        }),
        InputFormat::Gmail => {
            let message: GmailMessage = serde_json::from_value(raw.clone())
                .map_err(|e| EnvelopeError::Decode(e.to_string()))?;
            from_gmail_message(&message)
        }
    }
}

pub fn from_gmail_message(message: &GmailMessage) -> Result<Envelope, EnvelopeError> {
    let author = message
        .sender()
        .ok_or(EnvelopeError::MissingField("From"))?
        .to_string();
    Ok(Envelope {
        author,
        recipient: message.header("To").unwrap_or_default().to_string(),
        subject: message.header("Subject").unwrap_or("No Subject").to_string(),
        thread_text: message.body_text().unwrap_or_default(),
        source_id: Some(message.id.clone()),
    })
}

fn required(raw: &Value, key: &'static str) -> Result<String, EnvelopeError> {
    optional(raw, key)?.ok_or(EnvelopeError::MissingField(key))
}

fn optional(raw: &Value, key: &'static str) -> Result<Option<String>, EnvelopeError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(EnvelopeError::InvalidField(key)),
    }
}
