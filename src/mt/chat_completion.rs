//! Chat-completion backend (llama.cpp server and other OpenAI-compatible APIs)
//!
//! Sends `POST {url}` with a `messages` array holding the system and user
//! prompts, and reads the answer from `choices[0].message.content`.
//!
//! # Configuration
//!
//! [`ChatCompletionProvider::from_env`] reads:
//! - `LLM_URL` (default `http://localhost:8080/v1/chat/completions`)
//! - `LLM_MODEL` (required)
//! - `LLM_API_KEY` (optional, sent as a bearer token)
//!
//! # Example
//!
//! ```ignore
//! use source_translate::mt::{ChatCompletionProvider, TranslationBackend};
//! use std::time::Duration;
//!
//! let provider = ChatCompletionProvider::new(
//!     "http://localhost:8080/v1/chat/completions",
//!     "gemma-3-4b-it",
//!     Duration::from_secs(600),
//! )?;
//! let reply = provider.translate(system_prompt, user_prompt).await?;
//! ```

use crate::mt::backend::{
    BackendReply, DEFAULT_TIMEOUT, TranslationBackend, build_http_client, error_for_status,
    request_error,
};
use crate::mt::error::{MtError, MtResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::{Duration, Instant};

/// Chat-completion provider
#[derive(Clone)]
pub struct ChatCompletionProvider {
    /// Full endpoint URL, e.g. `http://localhost:8080/v1/chat/completions`
    url: String,
    /// Model identifier or server-side alias
    model: String,
    /// Optional bearer token
    api_key: Option<String>,
    /// HTTP client for async requests
    client: reqwest::Client,
    timeout: Duration,
}

impl ChatCompletionProvider {
    pub const DEFAULT_URL: &'static str = "http://localhost:8080/v1/chat/completions";

    /// Create a provider for `url` serving `model`
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - New provider instance
    /// * `Err(MtError)` - If URL or model is empty or the HTTP client cannot be built
    pub fn new(url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> MtResult<Self> {
        let url = url.into();
        let model = model.into();
        if url.trim().is_empty() {
            return Err(MtError::ConfigError("Backend URL cannot be empty".to_string()));
        }
        if model.trim().is_empty() {
            return Err(MtError::ConfigError("Model name cannot be empty".to_string()));
        }

        Ok(Self {
            url,
            model,
            api_key: None,
            client: build_http_client(timeout)?,
            timeout,
        })
    }

    /// Attach a bearer token sent with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.trim().is_empty()).then_some(api_key);
        self
    }

    /// Create a provider from `LLM_URL`, `LLM_MODEL` and `LLM_API_KEY`
    pub fn from_env() -> MtResult<Self> {
        let url = std::env::var("LLM_URL").unwrap_or_else(|_| Self::DEFAULT_URL.to_string());
        let model = std::env::var("LLM_MODEL").map_err(|_| {
            MtError::ConfigError("LLM_MODEL environment variable not set".to_string())
        })?;

        let provider = Self::new(url, model, DEFAULT_TIMEOUT)?;
        Ok(match std::env::var("LLM_API_KEY") {
            Ok(key) => provider.with_api_key(key),
            Err(_) => provider,
        })
    }

    fn build_payload(&self, system_prompt: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": 0.0
        })
    }

    /// Interpret a raw HTTP response
    fn parse_reply(status: u16, body: &str) -> MtResult<String> {
        if !(200..300).contains(&status) {
            return Err(error_for_status(status, body));
        }

        let json: Value = serde_json::from_str(body).map_err(|e| {
            MtError::InvalidResponse(format!("Failed to parse chat completion response: {}", e))
        })?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                MtError::InvalidResponse(
                    "Invalid response: missing 'choices[0].message.content'".to_string(),
                )
            })
    }
}

impl std::fmt::Debug for ChatCompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionProvider")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl TranslationBackend for ChatCompletionProvider {
    async fn translate(&self, system_prompt: &str, user_prompt: &str) -> MtResult<BackendReply> {
        let body = self.build_payload(system_prompt, user_prompt);

        let started = Instant::now();
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| request_error(e, self.timeout))?;
        let elapsed = started.elapsed();

        let content = Self::parse_reply(status, &text)?;
        Ok(BackendReply {
            text: content,
            elapsed,
        })
    }

    fn provider_name(&self) -> &str {
        "Chat Completion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ChatCompletionProvider {
        ChatCompletionProvider::new(
            ChatCompletionProvider::DEFAULT_URL,
            "test-model",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    // ========== Initialization Tests ==========

    #[test]
    fn test_new_with_valid_config() {
        let provider = provider();
        assert_eq!(provider.provider_name(), "Chat Completion");
        assert!(format!("{:?}", provider).contains("5s"));
    }

    #[test]
    fn test_new_with_empty_model() {
        match ChatCompletionProvider::new("http://localhost", "  ", DEFAULT_TIMEOUT) {
            Err(MtError::ConfigError(msg)) => assert!(msg.contains("Model")),
            _ => panic!("Expected ConfigError"),
        }
    }

    #[test]
    fn test_new_with_empty_url() {
        assert!(ChatCompletionProvider::new("", "model", DEFAULT_TIMEOUT).is_err());
    }

    // ========== Payload Tests ==========

    #[test]
    fn test_payload_shape() {
        let payload = provider().build_payload("sys", "user");
        assert_eq!(payload["model"], "test-model");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][0]["content"], "sys");
        assert_eq!(payload["messages"][1]["role"], "user");
        assert_eq!(payload["messages"][1]["content"], "user");
        assert_eq!(payload["temperature"], 0.0);
    }

    // ========== Response Tests ==========

    #[test]
    fn test_parse_success() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hello"}}]}"#;
        assert_eq!(ChatCompletionProvider::parse_reply(200, body).unwrap(), "Hello");
    }

    #[test]
    fn test_parse_context_exceeded() {
        let body = r#"{"error":{"code":400,"type":"exceed_context_size_error"}}"#;
        let err = ChatCompletionProvider::parse_reply(400, body).unwrap_err();
        assert!(err.is_context_exceeded());
    }

    #[test]
    fn test_parse_http_error() {
        match ChatCompletionProvider::parse_reply(503, "loading model") {
            Err(MtError::Http { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "loading model");
            }
            other => panic!("Expected Http error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(
            ChatCompletionProvider::parse_reply(200, "not json"),
            Err(MtError::InvalidResponse(_))
        ));
        assert!(matches!(
            ChatCompletionProvider::parse_reply(200, r#"{"choices":[]}"#),
            Err(MtError::InvalidResponse(_))
        ));
    }

    // ========== Debug Implementation Test ==========

    #[test]
    fn test_debug_masks_api_key() {
        let provider = provider().with_api_key("secret-token");
        let debug_str = format!("{:?}", provider);
        assert!(debug_str.contains("***"));
        assert!(!debug_str.contains("secret-token"));
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let provider = provider().with_api_key("   ");
        assert!(provider.api_key.is_none());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepted by the kernel backlog, never answered
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v1/chat/completions", listener.local_addr().unwrap());
        let provider =
            ChatCompletionProvider::new(url, "gemma-3-4b-it", Duration::from_millis(200)).unwrap();

        let err = provider.translate("system", "user").await.unwrap_err();
        match err {
            MtError::Timeout(message) => assert!(message.contains("200ms"), "{message}"),
            other => panic!("Expected Timeout, got {:?}", other),
        }
        drop(listener);
    }

    // ========== Integration Tests (require a running server) ==========

    #[tokio::test]
    #[ignore] // Run with: cargo test --ignored
    async fn test_real_server_translation() {
        if std::env::var("LLM_MODEL").is_err() {
            eprintln!("Skipping: LLM_MODEL not set");
            return;
        }

        let provider = ChatCompletionProvider::from_env().unwrap();
        let reply = provider
            .translate(
                "Translate from Russian to English. Answer with the translation only.",
                "Привет, мир",
            )
            .await
            .unwrap();
        println!("Translation: {} ({:?})", reply.text, reply.elapsed);
        assert!(!reply.text.is_empty());
    }
}
