pub mod envelope;
pub mod format;
pub mod gmail;
pub mod parse;

pub use envelope::{Envelope, extract_address};
pub use format::{format_email_markdown, format_for_display, thread_to_plain_text};
pub use parse::{EnvelopeError, InputFormat, parse_envelope};
