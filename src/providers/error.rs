/// Failures of the mail and calendar collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("credentials unavailable: {0}")]
    CredentialUnavailable(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn is_credential_unavailable(&self) -> bool {
        matches!(self, Self::CredentialUnavailable(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
