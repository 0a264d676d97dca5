//! Source Rewriter
//!
//! Scans a file, sends every comment and string-literal interior through the
//! [`StringTranslator`], and reassembles the file with the original delimiters.
//! Code and char literals are copied unchanged.
//!
//! A span whose translation fails, or whose translation would change the
//! structure of the file (a newline inside a line comment, `*/` inside a block
//! comment, an unescaped quote inside a string literal), keeps its original
//! content. Such spans never fail the file.

use crate::mt::StringTranslator;
use crate::scanner::{self, Span, SpanKind};
use tracing::info;

/// Result of rewriting one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub text: String,
    /// Spans whose content went through the translator
    pub translated_spans: usize,
    /// Spans kept as-is because translation failed or was unsafe
    pub failed_spans: usize,
}

pub struct SourceRewriter<'a> {
    translator: &'a StringTranslator,
    /// Prefix for log lines, usually the file path
    label: String,
}

impl<'a> SourceRewriter<'a> {
    pub fn new(translator: &'a StringTranslator) -> Self {
        Self {
            translator,
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Rewrite `text`, translating spans sequentially in source order
    pub async fn rewrite(&self, text: &str) -> RewriteOutcome {
        let spans = scanner::scan(text);
        let mut out = String::with_capacity(text.len());
        let mut translated_spans = 0;
        let mut failed_spans = 0;

        for span in &spans {
            if !span.kind.is_translatable() {
                out.push_str(&span.to_source());
                continue;
            }

            match self.translate_span(span).await {
                Ok(content) => {
                    translated_spans += 1;
                    span.write_with(&content, &mut out);
                }
                Err(reason) => {
                    failed_spans += 1;
                    info!(
                        "{}: keeping original {:?} at byte {}: {}",
                        self.label, span.kind, span.offset, reason
                    );
                    out.push_str(&span.to_source());
                }
            }
        }

        RewriteOutcome {
            text: out,
            translated_spans,
            failed_spans,
        }
    }

    async fn translate_span(&self, span: &Span<'_>) -> Result<String, String> {
        let translated = self
            .translator
            .translate_string(span.content)
            .await
            .map_err(|e| e.to_string())?;

        match unsafe_reason(span, &translated) {
            Some(reason) => Err(reason.to_string()),
            None => Ok(translated),
        }
    }
}

/// Why `translated` cannot replace the content of `span`, if it cannot
fn unsafe_reason(span: &Span<'_>, translated: &str) -> Option<&'static str> {
    match span.kind {
        SpanKind::LineComment if translated.contains(['\n', '\r']) => {
            Some("translation contains a line break")
        }
        SpanKind::BlockComment if translated.contains("*/") => {
            Some("translation closes the block comment")
        }
        SpanKind::StringLiteral => {
            let bytes = translated.as_bytes();
            let has_bare_quote = bytes
                .iter()
                .enumerate()
                .any(|(pos, &b)| b == b'"' && !scanner::is_escaped(bytes, pos, 0));
            if has_bare_quote {
                return Some("translation contains an unescaped quote");
            }
            if scanner::is_escaped(bytes, bytes.len(), 0) {
                return Some("translation ends with a dangling backslash");
            }
            let raw_break = |s: &str| s.contains(['\n', '\r']);
            if raw_break(translated) && !raw_break(span.content) {
                return Some("translation contains a line break");
            }
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mt::{MockMode, MockTranslator, TranslationPolicy};
    use crate::pipeline::Stats;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn translator(mode: MockMode) -> (StringTranslator, Arc<MockTranslator>) {
        let mock = Arc::new(MockTranslator::new(mode));
        let translator = StringTranslator::new(mock.clone(), "ru", "en", Arc::new(Stats::new()));
        (translator, mock)
    }

    fn mappings(pairs: &[(&str, &str)]) -> MockMode {
        MockMode::Mappings(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[tokio::test]
    async fn test_comments_and_strings_are_translated() {
        let (translator, _) = translator(mappings(&[
            ("привет мир", "hello world"),
            ("Сохранить файл", "Save file"),
            ("Документация класса", "Class documentation"),
        ]));
        let source = "/** Документация класса */\nclass A {\n  // привет мир\n  String s = \"Сохранить файл\";\n}\n";

        let outcome = SourceRewriter::new(&translator).rewrite(source).await;
        assert_eq!(
            outcome.text,
            "/** Class documentation */\nclass A {\n  // hello world\n  String s = \"Save file\";\n}\n"
        );
        assert_eq!(outcome.translated_spans, 3);
        assert_eq!(outcome.failed_spans, 0);
    }

    #[tokio::test]
    async fn test_code_and_char_literals_are_untouched() {
        let (translator, mock) = translator(MockMode::Suffix(" [en]".to_string()));
        let source = "char c = 'я'; char q = '\"'; int x = 1;";

        let outcome = SourceRewriter::new(&translator).rewrite(source).await;
        assert_eq!(outcome.text, source);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_span_keeps_original_and_continues() {
        let (translator, _) = translator(MockMode::Error("down".to_string()));
        let source = "// первый комментарий\nint a;\n/* второй комментарий */\n";

        let outcome = SourceRewriter::new(&translator).with_label("A.java").rewrite(source).await;
        assert_eq!(outcome.text, source);
        assert_eq!(outcome.failed_spans, 2);
        assert_eq!(outcome.translated_spans, 0);
    }

    #[tokio::test]
    async fn test_unsafe_translations_are_rejected() {
        let (translator, _) = translator(mappings(&[
            ("однострочный комментарий", "line one\nline two"),
            ("блочный комментарий", "closes */ early"),
            ("строка текста", "say \"hi\""),
            ("ещё строка", "ends with \\"),
        ]));
        let source = "// однострочный комментарий\n/* блочный комментарий */\nString a = \"строка текста\";\nString b = \"ещё строка\";\n";

        let outcome = SourceRewriter::new(&translator).rewrite(source).await;
        assert_eq!(outcome.text, source);
        assert_eq!(outcome.failed_spans, 4);
    }

    #[tokio::test]
    async fn test_escaped_quotes_in_translation_are_accepted() {
        let (translator, _) = translator(mappings(&[("скажи привет", "say \\\"hi\\\"")]));
        let source = "String a = \"скажи привет\";";

        let outcome = SourceRewriter::new(&translator).rewrite(source).await;
        assert_eq!(outcome.text, "String a = \"say \\\"hi\\\"\";");
    }

    #[tokio::test]
    async fn test_unterminated_block_comment_is_copied() {
        let (translator, mock) = translator(MockMode::Suffix(" [en]".to_string()));
        let source = "int a;\n/* unfinished";

        let outcome = SourceRewriter::new(&translator).rewrite(source).await;
        assert_eq!(outcome.text, source);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_trailing_line_comment_is_translated() {
        let (translator, _) = translator(MockMode::Suffix(" [en]".to_string()));
        let outcome = SourceRewriter::new(&translator)
            .rewrite("int a; // конец файла")
            .await;
        assert_eq!(outcome.text, "int a; // конец файла [en]");
    }

    #[tokio::test]
    async fn test_bare_word_policy_reaches_rewriter() {
        let mock = Arc::new(MockTranslator::new(MockMode::Suffix("!".to_string())));
        let translator = StringTranslator::new(mock.clone(), "ru", "en", Arc::new(Stats::new()))
            .with_policy(TranslationPolicy {
                bare_words_visible: true,
                ..Default::default()
            });

        let outcome = SourceRewriter::new(&translator)
            .rewrite("label(\"Save\", \"ui.save\");")
            .await;
        assert_eq!(outcome.text, "label(\"Save!\", \"ui.save\");");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_single_word_strings_stay_by_default() {
        let (translator, mock) = translator(MockMode::Suffix(" [en]".to_string()));
        let source = "button(\"Сохранить\"); // Сохраняем настройки\n";

        let outcome = SourceRewriter::new(&translator).rewrite(source).await;
        assert_eq!(
            outcome.text,
            "button(\"Сохранить\"); // Сохраняем настройки [en]\n"
        );
        assert_eq!(mock.call_count(), 1);
    }
}
