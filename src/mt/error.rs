/// Error types for the Machine Translation module
use thiserror::Error;

/// Failures raised while talking to a translation backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MtError {
    /// The backend rejected the input as larger than its context window
    #[error("Context size exceeded: {0}")]
    ContextExceeded(String),
    /// Non-success HTTP status
    #[error("Backend error HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// The request did not complete within the configured timeout
    #[error("Backend request timed out: {0}")]
    Timeout(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    /// The response body could not be interpreted
    #[error("Unexpected response format: {0}")]
    InvalidResponse(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid locale: {0}")]
    InvalidLocale(String),
    #[error("Translation error: {0}")]
    TranslationError(String),
}

impl MtError {
    /// Whether the backend refused the input for being too large
    ///
    /// Callers may react by splitting the input; the pipeline treats it like any
    /// other failed translation.
    pub fn is_context_exceeded(&self) -> bool {
        matches!(self, MtError::ContextExceeded(_))
    }
}

impl From<reqwest::Error> for MtError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MtError::Timeout(err.to_string())
        } else {
            MtError::NetworkError(err.to_string())
        }
    }
}

/// Result type for MT operations
pub type MtResult<T> = Result<T, MtError>;
