//! Which strings are worth sending to a backend, and how replies are cleaned
//!
//! Both rules are heuristics. [`TranslationPolicy`] makes their precedence
//! configurable instead of fixing it.

use serde::Serialize;

/// When to remove an outer quote pair the backend wrapped around its answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteStrip {
    /// Always strip a matching outer quote pair
    Always,
    /// Strip unless the source itself starts and ends with that quote
    #[default]
    UnlessSourceQuoted,
    /// Keep replies as returned
    Never,
}

impl QuoteStrip {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "always" => Some(Self::Always),
            "unless-quoted" | "unless-source-quoted" => Some(Self::UnlessSourceQuoted),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

/// Configurable visibility and quote-stripping rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TranslationPolicy {
    /// Treat single alphabetic words ("Save", "Сохранить") in any script as
    /// translatable even though they look like identifiers
    pub bare_words_visible: bool,
    pub quote_strip: QuoteStrip,
}

/// Only letters, digits and `._-` (any script), no whitespace
pub fn is_key_like(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Contains a path separator and no whitespace
pub fn is_path_like(s: &str) -> bool {
    (s.contains('/') || s.contains('\\')) && !s.chars().any(char::is_whitespace)
}

fn is_bare_word(s: &str) -> bool {
    s.chars().all(char::is_alphabetic)
}

impl TranslationPolicy {
    /// Whether `s` carries natural-language text worth translating
    pub fn is_visible(&self, s: &str) -> bool {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return false;
        }
        if self.bare_words_visible && is_bare_word(trimmed) {
            return true;
        }
        !is_key_like(trimmed) && !is_path_like(trimmed)
    }

    /// Clean a backend reply: trim it and drop a spurious outer quote pair
    pub fn strip_quotes(&self, source: &str, reply: &str) -> String {
        let reply = reply.trim();

        for quote in ['"', '\''] {
            let wrapped = reply.len() >= 2 && reply.starts_with(quote) && reply.ends_with(quote);
            if !wrapped {
                continue;
            }
            let source = source.trim();
            let source_quoted =
                source.len() >= 2 && source.starts_with(quote) && source.ends_with(quote);
            let strip = match self.quote_strip {
                QuoteStrip::Always => true,
                QuoteStrip::UnlessSourceQuoted => !source_quoted,
                QuoteStrip::Never => false,
            };
            if strip {
                return reply[1..reply.len() - 1].trim().to_string();
            }
        }

        reply.to_string()
    }
}
