//! Translation backend trait and utilities
//!
//! This module defines the `TranslationBackend` trait for provider abstraction,
//! enabling different LLM servers (OpenAI-compatible chat completions,
//! Ollama-style generate, mock) without coupling the pipeline to any of them.
//!
//! # Example
//!
//! ```ignore
//! use source_translate::mt::{ChatCompletionProvider, TranslationBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = ChatCompletionProvider::from_env()?;
//!     let reply = provider
//!         .translate("Translate Russian to English.", "Привет")
//!         .await?;
//!     println!("{} ({:.2}s)", reply.text, reply.elapsed.as_secs_f64());
//!     Ok(())
//! }
//! ```

use crate::mt::error::{MtError, MtResult};
use async_trait::async_trait;
use std::time::Duration;

/// Markers in an error payload meaning the input did not fit the context window
const CONTEXT_OVERFLOW_MARKERS: [&str; 3] = [
    "exceed_context_size_error",
    "exceeds the available context size",
    "context length exceeded",
];

/// Maximum number of characters of a backend error body kept in messages
const ERROR_BODY_LIMIT: usize = 400;

/// Default timeout for one backend call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Text returned by a backend together with the time the call took
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub text: String,
    pub elapsed: Duration,
}

/// Generic trait for LLM translation backends
///
/// Implementations send one system prompt and one user prompt and return the
/// model's raw answer. All methods are async to support network requests.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Submit a prompt pair and return the reply text with its latency
    ///
    /// # Returns
    ///
    /// * `Ok(BackendReply)` - The raw model answer
    /// * `Err(MtError::ContextExceeded)` - The input does not fit the model context
    /// * `Err(MtError)` - Any other failure (timeout, HTTP status, malformed body)
    async fn translate(&self, system_prompt: &str, user_prompt: &str) -> MtResult<BackendReply>;

    /// Get the name of this backend
    ///
    /// Used for logging to identify which provider handled a translation.
    fn provider_name(&self) -> &str;
}

/// Whether an error payload reports a context-window overflow
pub fn is_context_overflow(body: &str) -> bool {
    CONTEXT_OVERFLOW_MARKERS
        .iter()
        .any(|marker| body.contains(marker))
}

/// Shorten an error body for inclusion in error messages
pub(crate) fn truncate_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

/// Classify a non-success response into an `MtError`
pub(crate) fn error_for_status(status: u16, body: &str) -> MtError {
    if is_context_overflow(body) {
        MtError::ContextExceeded(truncate_body(body))
    } else {
        MtError::Http {
            status,
            body: truncate_body(body),
        }
    }
}

/// Classify a failed request, naming the configured limit on timeouts
pub(crate) fn request_error(err: reqwest::Error, timeout: Duration) -> MtError {
    if err.is_timeout() {
        MtError::Timeout(format!("no reply within {:?}: {}", timeout, err))
    } else {
        err.into()
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> MtResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MtError::NetworkError(format!("Failed to create HTTP client: {}", e)))
}

/// Normalize a locale code by stripping region information
///
/// - `en-US` → `en`
/// - `zh-Hans` → `zh`
/// - `ru` → `ru` (unchanged)
pub fn normalize_locale(locale: &str) -> String {
    locale
        .split(['-', '_'])
        .next()
        .unwrap_or(locale)
        .to_lowercase()
}

/// Validate that a locale code is in acceptable format
///
/// Checks that the code is non-empty and contains only alphanumeric
/// characters, hyphens, and underscores.
pub fn validate_locale(locale: &str) -> MtResult<()> {
    if locale.is_empty() {
        return Err(MtError::InvalidLocale("Locale code is empty".to_string()));
    }

    if !locale
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(MtError::InvalidLocale(format!(
            "Invalid characters in locale code: {}",
            locale
        )));
    }

    Ok(())
}
