//! Structural QA checks comparing an original text with its translation
//!
//! Code checks reduce both files to a *skeleton*: the code with every comment
//! and string literal replaced by a positional marker. A translation that only
//! touched natural-language text has the same skeleton as its original.

use crate::scanner::{self, SpanKind};
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Phrases that betray a chatty model answer instead of a translation
///
/// A phrase is only flagged when it occurs more often in the translation
/// than in the original, so text that already names an API or an LLM can
/// carry the name through unchanged. One extra occurrence is enough.
pub const BANNED_PHRASES: [&str; 9] = [
    "OpenAI",
    "ChatGPT",
    "LLM",
    "API",
    "Key improvements",
    "The code now",
    "Error generating text",
    "In this example",
    "Below is",
];

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("sentence pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QaStatus {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    EmptyTranslation,
    BannedToken,
    StructureChanged,
    StringCountMismatch,
    CommentCountMismatch,
    TooManySentences,
    UntranslatedSpans,
}

impl IssueCode {
    /// Critical issues fail a check; the others only warn
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            IssueCode::EmptyTranslation | IssueCode::BannedToken | IssueCode::StructureChanged
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaIssue {
    pub code: IssueCode,
    pub message: String,
}

impl QaIssue {
    fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaResult {
    pub status: QaStatus,
    pub issues: Vec<QaIssue>,
    pub details: BTreeMap<String, Value>,
}

impl QaResult {
    fn from_issues(issues: Vec<QaIssue>, details: BTreeMap<String, Value>) -> Self {
        let status = if issues.iter().any(|issue| issue.code.is_critical()) {
            QaStatus::Fail
        } else if issues.is_empty() {
            QaStatus::Ok
        } else {
            QaStatus::Warn
        };
        Self {
            status,
            issues,
            details,
        }
    }

    pub fn has_issue(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }

    /// Add a non-critical issue after the fact, downgrading `ok` to `warn`
    pub fn push_warning(&mut self, code: IssueCode, message: impl Into<String>) {
        self.issues.push(QaIssue::new(code, message));
        if self.status == QaStatus::Ok {
            self.status = QaStatus::Warn;
        }
    }
}

/// Skeleton of a source file and the number of strings and comments in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    pub text: String,
    pub strings: usize,
    pub comments: usize,
}

/// Replace every string literal with `__STR{i}__` and every comment with
/// `__CMT{j}__`; code and char literals are kept
pub fn skeleton(text: &str) -> Skeleton {
    let mut out = String::with_capacity(text.len());
    let mut strings = 0;
    let mut comments = 0;

    for span in scanner::scan(text) {
        match span.kind {
            SpanKind::StringLiteral => {
                out.push_str(&format!("__STR{}__", strings));
                strings += 1;
            }
            SpanKind::LineComment | SpanKind::BlockComment => {
                out.push_str(&format!("__CMT{}__", comments));
                comments += 1;
            }
            SpanKind::Code | SpanKind::CharLiteral => out.push_str(&span.to_source()),
        }
    }

    Skeleton {
        text: out,
        strings,
        comments,
    }
}

fn sentence_count(text: &str) -> usize {
    SENTENCE_END
        .split(text)
        .filter(|part| !part.trim().is_empty())
        .count()
}

/// Banned phrases occurring more often in `translated` than in `original`
fn banned_issues(original: &str, translated: &str) -> Vec<QaIssue> {
    BANNED_PHRASES
        .iter()
        .filter(|phrase| translated.matches(*phrase).count() > original.matches(*phrase).count())
        .map(|phrase| {
            QaIssue::new(
                IssueCode::BannedToken,
                format!("Banned token '{}' found in translation.", phrase),
            )
        })
        .collect()
}

/// Check one translated plain-text string
pub fn check_plain(original: &str, translated: &str) -> QaResult {
    let mut issues = Vec::new();
    let mut details = BTreeMap::new();
    details.insert("orig_len".to_string(), json!(original.chars().count()));
    details.insert("translated_len".to_string(), json!(translated.chars().count()));

    if translated.trim().is_empty() {
        issues.push(QaIssue::new(
            IssueCode::EmptyTranslation,
            "Translated string is empty.",
        ));
    }

    issues.extend(banned_issues(original, translated));

    let orig_sentences = sentence_count(original);
    let translated_sentences = sentence_count(translated);
    details.insert("orig_sentences".to_string(), json!(orig_sentences));
    details.insert("translated_sentences".to_string(), json!(translated_sentences));
    if translated_sentences > orig_sentences + 2 {
        issues.push(QaIssue::new(
            IssueCode::TooManySentences,
            format!(
                "Translated string has suspiciously more sentences: {} vs {}.",
                translated_sentences, orig_sentences
            ),
        ));
    }

    QaResult::from_issues(issues, details)
}

/// Check one translated source file against its original
pub fn check_code(original: &str, translated: &str) -> QaResult {
    let mut issues = Vec::new();
    let mut details = BTreeMap::new();

    if translated.trim().is_empty() {
        issues.push(QaIssue::new(
            IssueCode::EmptyTranslation,
            "Translated file is empty.",
        ));
    }

    let before = skeleton(original);
    let after = skeleton(translated);
    details.insert("strings_orig".to_string(), json!(before.strings));
    details.insert("strings_translated".to_string(), json!(after.strings));
    details.insert("comments_orig".to_string(), json!(before.comments));
    details.insert("comments_translated".to_string(), json!(after.comments));

    if before.text != after.text {
        issues.push(QaIssue::new(
            IssueCode::StructureChanged,
            "Code skeleton changed between original and translation.",
        ));
    }
    if before.strings != after.strings {
        issues.push(QaIssue::new(
            IssueCode::StringCountMismatch,
            "Number of string literals changed.",
        ));
    }
    if before.comments != after.comments {
        issues.push(QaIssue::new(
            IssueCode::CommentCountMismatch,
            "Number of comments changed.",
        ));
    }

    issues.extend(banned_issues(original, translated));

    QaResult::from_issues(issues, details)
}

/// Alias of [`check_code`]
pub fn check(original: &str, translated: &str) -> QaResult {
    check_code(original, translated)
}
