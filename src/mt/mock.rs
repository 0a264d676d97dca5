//! Mock translation backend for testing
//!
//! This module provides a deterministic, network-free backend for exercising
//! the translation pipeline without a running model server. It answers the
//! payload of the user prompt (see [`prompts::payload_of`]) according to a
//! [`MockMode`] and records every call it receives.
//!
//! # Example
//!
//! ```ignore
//! use source_translate::mt::{MockMode, MockTranslator, TranslationBackend};
//!
//! #[tokio::test]
//! async fn test_translation() {
//!     let mock = MockTranslator::new(MockMode::Suffix(" [en]".to_string()));
//!     let reply = mock.translate("system", "Translate...\n\nпривет").await.unwrap();
//!     assert_eq!(reply.text, "привет [en]");
//! }
//! ```

use crate::mt::backend::{BackendReply, TranslationBackend};
use crate::mt::error::{MtError, MtResult};
use crate::mt::prompts;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Mock translation modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append a fixed suffix: "привет" → "привет [en]"
    /// Placeholder tokens pass through untouched
    Suffix(String),

    /// Use predefined mappings for realistic translations;
    /// unknown payloads are returned unchanged
    Mappings(HashMap<String, String>),

    /// Reverse the order of whitespace-separated words
    Reorder,

    /// Wrap the payload in double quotes, as chatty models sometimes do
    Quoted,

    /// Simulate a generic backend error
    Error(String),

    /// Simulate a context-window overflow
    ContextExceeded,

    /// No-op: return the payload unchanged
    NoOp,
}

/// Mock backend that simulates various translation scenarios
#[derive(Debug)]
pub struct MockTranslator {
    mode: MockMode,
    /// Optional simulated network delay (in milliseconds)
    delay_ms: u64,
    calls: AtomicUsize,
    payloads: Mutex<Vec<String>>,
}

impl MockTranslator {
    pub fn new(mode: MockMode) -> Self {
        Self::with_delay(mode, 0)
    }

    /// Create a MockTranslator with simulated network delay
    ///
    /// ```ignore
    /// let mock = MockTranslator::with_delay(MockMode::NoOp, 50);
    /// // Each call will take ~50ms
    /// ```
    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        Self {
            mode,
            delay_ms,
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    /// Number of `translate` calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Payloads received so far, in call order
    pub fn payloads(&self) -> Vec<String> {
        self.payloads
            .lock()
            .map(|payloads| payloads.clone())
            .unwrap_or_default()
    }

    async fn apply_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn apply_translation(&self, text: &str) -> MtResult<String> {
        match &self.mode {
            MockMode::Suffix(suffix) => Ok(format!("{}{}", text, suffix)),
            MockMode::Mappings(map) => Ok(map.get(text).cloned().unwrap_or_else(|| text.to_string())),
            MockMode::Reorder => Ok(text.split_whitespace().rev().collect::<Vec<_>>().join(" ")),
            MockMode::Quoted => Ok(format!("\"{}\"", text)),
            MockMode::Error(msg) => Err(MtError::TranslationError(msg.clone())),
            MockMode::ContextExceeded => Err(MtError::ContextExceeded(
                "exceed_context_size_error".to_string(),
            )),
            MockMode::NoOp => Ok(text.to_string()),
        }
    }
}

#[async_trait]
impl TranslationBackend for MockTranslator {
    async fn translate(&self, _system_prompt: &str, user_prompt: &str) -> MtResult<BackendReply> {
        let started = Instant::now();
        self.calls.fetch_add(1, Ordering::SeqCst);

        let payload = prompts::payload_of(user_prompt);
        if let Ok(mut payloads) = self.payloads.lock() {
            payloads.push(payload.to_string());
        }

        self.apply_delay().await;

        Ok(BackendReply {
            text: self.apply_translation(payload)?,
            elapsed: started.elapsed(),
        })
    }

    fn provider_name(&self) -> &str {
        "Mock Translator"
    }
}
