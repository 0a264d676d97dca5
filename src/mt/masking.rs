//! Placeholder masking for protecting non-prose tokens during machine translation
//!
//! Format specifiers (`%s`, `%1$d`, `%.2f`), brace-indexed placeholders (`{0}`),
//! interpolation placeholders (`${user}`) and backslash escapes (`\n`, `\"`)
//! are replaced by opaque tokens before the text reaches a backend, and put
//! back afterwards. Translation backends reliably mangle such tokens otherwise.
//!
//! Format: `__PH_{index}__`. When the text already contains `__PH_`, another
//! tag (`__PH1_`, `__PH2_`, ...) is chosen so that tokens never collide with
//! existing text.
//!
//! # Example
//!
//! ```ignore
//! let (masked, map) = mask("Error: %s at line %d");
//! assert_eq!(masked, "Error: __PH_0__ at line __PH_1__");
//! assert_eq!(unmask(&masked, &map), "Error: %s at line %d");
//! ```

use regex::Regex;
use std::sync::LazyLock;

/// Escapes, printf-style specifiers, `{N}` and `${name}`, in that order
static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"\\(?:u[0-9a-fA-F]{4}|[ntr"'\\])"#,
        r"|%(?:\d+\$)?[-#+0,(]*\d*(?:\.\d+)?[bBhHsScCdoxXeEfgGaAn%]",
        r"|\{\d+\}",
        r"|\$\{[A-Za-z_][\w.\-]*\}",
    ))
    .expect("placeholder pattern is valid")
});

const BASE_TAG: &str = "PH";

/// Original substrings replaced by [`mask`], addressable by token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    tag: String,
    originals: Vec<String>,
}

impl PlaceholderMap {
    /// Token standing for the `index`-th masked substring
    pub fn token(&self, index: usize) -> String {
        format!("__{}_{}__", self.tag, index)
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// `(token, original)` pairs in masking order
    pub fn entries(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        self.originals
            .iter()
            .enumerate()
            .map(|(i, original)| (self.token(i), original.as_str()))
    }

    /// Tokens that do not occur in `text`
    pub fn missing_tokens(&self, text: &str) -> Vec<String> {
        self.entries()
            .map(|(token, _)| token)
            .filter(|token| !text.contains(token.as_str()))
            .collect()
    }

    fn token_pattern(&self) -> Regex {
        Regex::new(&format!(r"__{}_(\d+)__", regex::escape(&self.tag)))
            .expect("token pattern is valid")
    }
}

/// Pick a tag whose token prefix does not already occur in `text`
fn choose_tag(text: &str) -> String {
    let mut tag = BASE_TAG.to_string();
    let mut attempt = 0;
    while text.contains(&format!("__{}_", tag)) {
        attempt += 1;
        tag = format!("{}{}", BASE_TAG, attempt);
    }
    tag
}

/// Replace placeholders in `text` with unique tokens
pub fn mask(text: &str) -> (String, PlaceholderMap) {
    let mut map = PlaceholderMap {
        tag: choose_tag(text),
        originals: Vec::new(),
    };

    let masked = PLACEHOLDER_PATTERN
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let token = map.token(map.originals.len());
            map.originals.push(caps[0].to_string());
            token
        })
        .into_owned();

    (masked, map)
}

/// Restore the substrings replaced by [`mask`]
///
/// Tokens are resolved in one left-to-right pass; tokens unknown to `map` are
/// left untouched.
pub fn unmask(text: &str, map: &PlaceholderMap) -> String {
    if map.is_empty() {
        return text.to_string();
    }

    map.token_pattern()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| map.originals.get(index))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
