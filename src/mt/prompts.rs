//! Prompts sent to the translation backend
//!
//! The user prompt is a single instruction line, a blank line, then the text
//! to translate. [`payload_of`] recovers the text from a user prompt.

use crate::mt::backend::normalize_locale;

/// Separator between the instruction line and the payload of a user prompt
const PAYLOAD_SEPARATOR: &str = "\n\n";

/// Human-readable language name for a language code
///
/// Region subtags are ignored (`en-US` is English); unknown codes are
/// returned as given.
pub fn language_name(code: &str) -> String {
    match normalize_locale(code).as_str() {
        "ru" => "Russian".to_string(),
        "en" => "English (US)".to_string(),
        "tr" => "Turkish".to_string(),
        "zh" => "Chinese".to_string(),
        "de" => "German".to_string(),
        "fr" => "French".to_string(),
        "es" => "Spanish".to_string(),
        "" => "Unknown".to_string(),
        _ => code.to_string(),
    }
}

/// Fixed system instruction for one language pair
pub fn build_system_prompt(source_lang: &str, target_lang: &str) -> String {
    let source = language_name(source_lang);
    let target = language_name(target_lang);

    format!(
        "You are a STRICT technical translator for SOURCE CODE comments and string literals.\n\
         \n\
         LANGUAGE DIRECTION:\n\
         Translate ONLY human-readable text: {source} -> {target}\n\
         \n\
         DO NOT TRANSLATE:\n\
         - Code identifiers, property keys, status codes and constants.\n\
         - URLs, file names, file paths, ports and IP addresses.\n\
         - Placeholder tokens such as __PH_0__; keep every one of them exactly as written.\n\
         - Language keywords and syntax.\n\
         \n\
         YOU MUST:\n\
         - Preserve punctuation, line breaks, indentation and whitespace.\n\
         - Preserve backslashes and escape sequences exactly.\n\
         - Translate ONLY the natural-language content.\n\
         \n\
         OUTPUT FORMAT:\n\
         Return ONLY the translation. No explanations, no quotes, no notes."
    )
}

/// User prompt carrying one (already masked) text
pub fn build_user_prompt(text: &str, source_lang: &str, target_lang: &str) -> String {
    format!(
        "Translate the following text from {} to {}. Return ONLY the translated text, without quotes, comments or explanations.{}{}",
        language_name(source_lang),
        language_name(target_lang),
        PAYLOAD_SEPARATOR,
        text
    )
}

/// The text part of a prompt built by [`build_user_prompt`]
pub fn payload_of(user_prompt: &str) -> &str {
    user_prompt
        .split_once(PAYLOAD_SEPARATOR)
        .map(|(_, payload)| payload)
        .unwrap_or(user_prompt)
}
