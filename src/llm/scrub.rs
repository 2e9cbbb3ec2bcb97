use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 200;
const SECRET_MARKERS: [&str; 6] = ["sk-", "Bearer ", "ya29.", "1//", "GOCSPX-", "AIza"];
const REDACTED: &str = "[REDACTED]";

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '+' | '=')
}

/// Replace anything that looks like an API key or OAuth token with a marker.
pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    if !SECRET_MARKERS.iter().any(|marker| input.contains(marker)) {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for marker in SECRET_MARKERS {
        let mut search_from = 0;
        while let Some(rel) = scrubbed[search_from..].find(marker) {
            let start = search_from + rel;
            let content_start = start + marker.len();
            let token_len: usize = scrubbed[content_start..]
                .chars()
                .take_while(|c| is_secret_char(*c))
                .map(char::len_utf8)
                .sum();

            if token_len == 0 {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..content_start + token_len, REDACTED);
            search_from = start + REDACTED.len();
        }
    }
    Cow::Owned(scrubbed)
}

pub fn sanitize_api_error(body: &str) -> String {
    let scrubbed = scrub_secret_patterns(body);
    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed.into_owned();
    }
    let truncated: String = scrubbed.chars().take(MAX_API_ERROR_CHARS).collect();
    format!("{truncated}...")
}

pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    let sanitized = sanitize_api_error(&body);
    anyhow::anyhow!("{provider} API error ({status}): {sanitized}")
}
