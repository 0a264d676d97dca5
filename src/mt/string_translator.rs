//! Memoized translation of single strings
//!
//! [`StringTranslator`] is the only component that talks to a backend during
//! a run. For each distinct input it decides visibility, masks placeholders,
//! calls the backend once, cleans and unmasks the reply, and records the pair
//! in the glossary log.
//!
//! # Example
//!
//! ```ignore
//! use source_translate::mt::{MockMode, MockTranslator, StringTranslator};
//! use source_translate::pipeline::Stats;
//! use std::sync::Arc;
//!
//! let backend = Arc::new(MockTranslator::new(MockMode::Suffix(" [en]".into())));
//! let translator = StringTranslator::new(backend, "ru", "en", Arc::new(Stats::new()));
//! let out = translator.translate_string(" привет мир ").await?;
//! assert_eq!(out, " привет мир [en] ");
//! ```

use crate::mt::backend::TranslationBackend;
use crate::mt::error::{MtError, MtResult};
use crate::mt::glossary::GlossaryLog;
use crate::mt::masking;
use crate::mt::prompts;
use crate::mt::visibility::TranslationPolicy;
use crate::pipeline::stats::Stats;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

type CacheSlot = Arc<OnceCell<String>>;

pub struct StringTranslator {
    backend: Arc<dyn TranslationBackend>,
    source_lang: String,
    target_lang: String,
    policy: TranslationPolicy,
    system_prompt: String,
    /// Exact source string -> translation; a slot is filled at most once
    cache: Mutex<HashMap<String, CacheSlot>>,
    stats: Arc<Stats>,
    glossary: Option<Arc<GlossaryLog>>,
}

impl StringTranslator {
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        stats: Arc<Stats>,
    ) -> Self {
        let source_lang = source_lang.into();
        let target_lang = target_lang.into();
        let system_prompt = prompts::build_system_prompt(&source_lang, &target_lang);

        Self {
            backend,
            source_lang,
            target_lang,
            policy: TranslationPolicy::default(),
            system_prompt,
            cache: Mutex::new(HashMap::new()),
            stats,
            glossary: None,
        }
    }

    pub fn with_policy(mut self, policy: TranslationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_glossary(mut self, glossary: Arc<GlossaryLog>) -> Self {
        self.glossary = Some(glossary);
        self
    }

    /// A translator sharing backend, languages, policy and glossary, with an
    /// empty cache and its own counters
    pub fn fork(&self, stats: Arc<Stats>) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            source_lang: self.source_lang.clone(),
            target_lang: self.target_lang.clone(),
            policy: self.policy,
            system_prompt: self.system_prompt.clone(),
            cache: Mutex::new(HashMap::new()),
            stats,
            glossary: self.glossary.clone(),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.provider_name()
    }

    pub fn policy(&self) -> &TranslationPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    /// Number of strings with a cached translation
    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Translate `text`, calling the backend at most once per distinct input
    ///
    /// Concurrent callers asking for the same string wait for the single
    /// in-flight call. A failed call caches nothing; the error is returned to
    /// every waiter and a later call tries again.
    pub async fn translate_string(&self, text: &str) -> MtResult<String> {
        let slot = {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cache.entry(text.to_string()).or_default())
        };

        slot.get_or_try_init(|| self.resolve(text))
            .await
            .cloned()
    }

    async fn resolve(&self, text: &str) -> MtResult<String> {
        if !self.policy.is_visible(text) {
            return Ok(text.to_string());
        }

        let (leading, core, trailing) = split_outer_whitespace(text);
        let (masked, placeholders) = masking::mask(core);
        let user_prompt = prompts::build_user_prompt(&masked, &self.source_lang, &self.target_lang);

        let reply = self
            .backend
            .translate(&self.system_prompt, &user_prompt)
            .await?;

        let cleaned = self.policy.strip_quotes(&masked, &reply.text);
        if cleaned.is_empty() {
            return Err(MtError::InvalidResponse(format!(
                "{} returned an empty translation",
                self.backend.provider_name()
            )));
        }

        let missing = placeholders.missing_tokens(&cleaned);
        if !missing.is_empty() {
            warn!(
                "Placeholders lost in translation of {:?}: {}",
                core,
                missing.join(", ")
            );
        }

        let translated_core = masking::unmask(&cleaned, &placeholders);
        self.stats
            .record_backend_call(reply.elapsed, core, &translated_core);
        debug!(
            "Translated {} chars in {:.2}s",
            core.chars().count(),
            reply.elapsed.as_secs_f64()
        );

        if let Some(glossary) = &self.glossary {
            glossary.append(core, &translated_core);
        }

        Ok(format!("{leading}{translated_core}{trailing}"))
    }
}

impl std::fmt::Debug for StringTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringTranslator")
            .field("backend", &self.backend.provider_name())
            .field("source_lang", &self.source_lang)
            .field("target_lang", &self.target_lang)
            .field("policy", &self.policy)
            .field("cached", &self.cached_len())
            .finish()
    }
}

/// Split `text` into leading whitespace, core and trailing whitespace
fn split_outer_whitespace(text: &str) -> (&str, &str, &str) {
    let start = text.len() - text.trim_start().len();
    let end = text.trim_end().len().max(start);
    (&text[..start], &text[start..end], &text[end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mt::mock::{MockMode, MockTranslator};
    use crate::mt::visibility::QuoteStrip;
    use tempfile::TempDir;

    fn translator_with(mock: Arc<MockTranslator>) -> StringTranslator {
        StringTranslator::new(mock, "ru", "en", Arc::new(Stats::new()))
    }

    fn suffix_mock() -> Arc<MockTranslator> {
        Arc::new(MockTranslator::new(MockMode::Suffix(" [en]".to_string())))
    }

    #[test]
    fn test_fork_keeps_backend_and_policy() {
        let translator = translator_with(suffix_mock()).with_policy(TranslationPolicy {
            bare_words_visible: true,
            ..TranslationPolicy::default()
        });
        let fork = translator.fork(Arc::new(Stats::new()));

        assert_eq!(fork.backend_name(), "Mock Translator");
        assert!(fork.policy().bare_words_visible);
        assert!(!Arc::ptr_eq(fork.stats(), translator.stats()));
    }

    #[test]
    fn test_split_outer_whitespace() {
        assert_eq!(split_outer_whitespace("  a b \n"), ("  ", "a b", " \n"));
        assert_eq!(split_outer_whitespace("abc"), ("", "abc", ""));
        assert_eq!(split_outer_whitespace("   "), ("   ", "", ""));
        assert_eq!(split_outer_whitespace(""), ("", "", ""));
    }

    #[tokio::test]
    async fn test_visible_text_is_translated_with_whitespace_kept() {
        let mock = suffix_mock();
        let translator = translator_with(Arc::clone(&mock));

        let out = translator.translate_string(" привет мир\n").await.unwrap();
        assert_eq!(out, " привет мир [en]\n");
        assert_eq!(mock.payloads(), vec!["привет мир".to_string()]);
    }

    #[tokio::test]
    async fn test_invisible_text_skips_backend() {
        let mock = suffix_mock();
        let translator = translator_with(Arc::clone(&mock));

        for text in ["", "   ", "user.name", "/etc/hosts", "MAX_VALUE"] {
            assert_eq!(translator.translate_string(text).await.unwrap(), text);
        }
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_issues_one_call_per_string() {
        let mock = suffix_mock();
        let translator = translator_with(Arc::clone(&mock));

        let first = translator.translate_string("Сохранить файл").await.unwrap();
        let second = translator.translate_string("Сохранить файл").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(mock.call_count(), 1);
        assert_eq!(translator.cached_len(), 1);
        assert_eq!(translator.stats().backend_calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_share_one_call() {
        let mock = Arc::new(MockTranslator::with_delay(
            MockMode::Suffix("!".to_string()),
            50,
        ));
        let translator = Arc::new(translator_with(Arc::clone(&mock)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let translator = Arc::clone(&translator);
            handles.push(tokio::spawn(async move {
                translator.translate_string("Ошибка чтения").await.unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "Ошибка чтения!");
        }
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_placeholders_are_masked_and_restored() {
        let mock = Arc::new(MockTranslator::new(MockMode::Reorder));
        let translator = translator_with(Arc::clone(&mock));

        let out = translator
            .translate_string("Ошибка: %s в строке %d")
            .await
            .unwrap();

        let payload = &mock.payloads()[0];
        assert!(!payload.contains("%s"));
        assert!(!payload.contains("%d"));
        assert_eq!(out, "%d строке в %s Ошибка:");
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let mock = Arc::new(MockTranslator::new(MockMode::Error("down".to_string())));
        let translator = translator_with(Arc::clone(&mock));

        assert!(translator.translate_string("привет мир").await.is_err());
        assert!(translator.translate_string("привет мир").await.is_err());
        assert_eq!(mock.call_count(), 2);
        assert_eq!(translator.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_context_exceeded_propagates() {
        let mock = Arc::new(MockTranslator::new(MockMode::ContextExceeded));
        let translator = translator_with(mock);
        let err = translator.translate_string("длинный текст").await.unwrap_err();
        assert!(err.is_context_exceeded());
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_error() {
        let mut map = HashMap::new();
        map.insert("привет мир".to_string(), "  ".to_string());
        let mock = Arc::new(MockTranslator::new(MockMode::Mappings(map)));
        let translator = translator_with(mock);
        assert!(matches!(
            translator.translate_string("привет мир").await,
            Err(MtError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_quote_policy_applies() {
        let mock = Arc::new(MockTranslator::new(MockMode::Quoted));
        let stripping = translator_with(Arc::clone(&mock));
        assert_eq!(stripping.translate_string("Привет всем").await.unwrap(), "Привет всем");

        let keeping = translator_with(mock).with_policy(TranslationPolicy {
            quote_strip: QuoteStrip::Never,
            ..Default::default()
        });
        assert_eq!(
            keeping.translate_string("Привет всем").await.unwrap(),
            "\"Привет всем\""
        );
    }

    #[tokio::test]
    async fn test_glossary_receives_pairs() {
        let dir = TempDir::new().unwrap();
        let glossary = Arc::new(GlossaryLog::open(dir.path().join("g.tsv")).unwrap());
        let translator = translator_with(suffix_mock()).with_glossary(glossary);

        translator.translate_string("привет мир").await.unwrap();
        translator.translate_string("привет мир").await.unwrap();
        translator.translate_string("config.key").await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("g.tsv")).unwrap();
        assert_eq!(content, "# original\ttranslation\nпривет мир\tпривет мир [en]\n");
    }

    #[tokio::test]
    async fn test_fork_has_fresh_cache() {
        let mock = suffix_mock();
        let translator = translator_with(Arc::clone(&mock));
        translator.translate_string("привет мир").await.unwrap();

        let forked = translator.fork(Arc::new(Stats::new()));
        assert_eq!(forked.cached_len(), 0);
        forked.translate_string("привет мир").await.unwrap();
        assert_eq!(mock.call_count(), 2);
        assert_eq!(translator.stats().backend_calls(), 1);
    }
}
