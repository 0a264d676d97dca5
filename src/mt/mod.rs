/// Translation Module
///
/// Everything that talks to, or wraps, a language-model translation backend.
///
/// # Overview
///
/// 1. **Backend trait & providers** - `TranslationBackend` with chat-completion,
///    generate and mock implementations
/// 2. **Masking** - Protects format specifiers and escapes from the backend
/// 3. **Prompts** - The fixed system instruction and per-string user prompt
/// 4. **Visibility policy** - Which strings are sent and how replies are cleaned
/// 5. **String translator** - Memoized, run-scoped translation of single strings
/// 6. **Glossary log** - Append-only record of every translated pair
///
/// # Example
///
/// ```ignore
/// use source_translate::mt::{ChatCompletionProvider, StringTranslator};
/// use source_translate::pipeline::Stats;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backend = Arc::new(ChatCompletionProvider::from_env()?);
///     let translator = StringTranslator::new(backend, "ru", "en", Arc::new(Stats::new()));
///     println!("{}", translator.translate_string("Ошибка: %s").await?);
///     Ok(())
/// }
/// ```
pub mod backend;
pub mod chat_completion;
pub mod error;
pub mod generate;
pub mod glossary;
pub mod masking;
pub mod mock;
pub mod prompts;
pub mod string_translator;
pub mod visibility;

pub use backend::{BackendReply, TranslationBackend, normalize_locale, validate_locale};
pub use chat_completion::ChatCompletionProvider;
pub use error::{MtError, MtResult};
pub use generate::GenerateProvider;
pub use glossary::GlossaryLog;
pub use masking::{PlaceholderMap, mask, unmask};
pub use mock::{MockMode, MockTranslator};
pub use string_translator::StringTranslator;
pub use visibility::{QuoteStrip, TranslationPolicy};
