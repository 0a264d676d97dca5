//! Generate-style backend (Ollama `/api/generate`)
//!
//! The system and user prompts are folded into a single prompt string; the
//! answer is read from the `response` field of a non-streaming reply.

use crate::mt::backend::{
    BackendReply, DEFAULT_TIMEOUT, TranslationBackend, build_http_client, error_for_status,
    request_error,
};
use crate::mt::error::{MtError, MtResult};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::time::{Duration, Instant};

/// Generate-endpoint provider
#[derive(Debug, Clone)]
pub struct GenerateProvider {
    url: String,
    model: String,
    /// Extra sampling options merged over the defaults (`temperature: 0.0`)
    options: Map<String, Value>,
    client: reqwest::Client,
    timeout: Duration,
}

impl GenerateProvider {
    pub const DEFAULT_URL: &'static str = "http://localhost:11434/api/generate";

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
            options: Map::new(),
            client: build_http_client(timeout)?,
            timeout,
        })
    }

    /// Create a provider from `LLM_URL` and `LLM_MODEL`
    pub fn from_env() -> MtResult<Self> {
        let url = std::env::var("LLM_URL").unwrap_or_else(|_| Self::DEFAULT_URL.to_string());
        let model = std::env::var("LLM_MODEL").map_err(|_| {
            MtError::ConfigError("LLM_MODEL environment variable not set".to_string())
        })?;
        Self::new(url, model, DEFAULT_TIMEOUT)
    }

    /// Set extra model options, e.g. `{"num_ctx": 8192}`
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    fn build_prompt(system_prompt: &str, user_prompt: &str) -> String {
        format!("System:\n{system_prompt}\n\nUser:\n{user_prompt}\n\nAssistant:")
    }

    fn build_payload(&self, system_prompt: &str, user_prompt: &str) -> Value {
        let mut options = Map::new();
        options.insert("temperature".to_string(), json!(0.0));
        for (key, value) in &self.options {
            options.insert(key.clone(), value.clone());
        }

        json!({
            "model": self.model,
            "prompt": Self::build_prompt(system_prompt, user_prompt),
            "options": options,
            "stream": false
        })
    }

    fn parse_reply(status: u16, body: &str) -> MtResult<String> {
        if !(200..300).contains(&status) {
            return Err(error_for_status(status, body));
        }

        let json: Value = serde_json::from_str(body).map_err(|e| {
            MtError::InvalidResponse(format!("Failed to parse generate response: {}", e))
        })?;

        json["response"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                MtError::InvalidResponse("Invalid response: missing 'response' field".to_string())
            })
    }
}

#[async_trait]
impl TranslationBackend for GenerateProvider {
    async fn translate(&self, system_prompt: &str, user_prompt: &str) -> MtResult<BackendReply> {
        let body = self.build_payload(system_prompt, user_prompt);

        let started = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| request_error(e, self.timeout))?;
        let elapsed = started.elapsed();

        Ok(BackendReply {
            text: Self::parse_reply(status, &text)?,
            elapsed,
        })
    }

    fn provider_name(&self) -> &str {
        "Generate"
    }
}
