//! Span Scanner for C-family source text
//!
//! Splits a source file into an ordered sequence of spans: code that must be
//! copied verbatim, and translatable spans (line comments, block comments and
//! string literals). Char literals are recognized so that a `'"'` never opens
//! a string, but their content is never translated.
//!
//! The scanner is a finite-state machine over five modes. Every mode change is
//! decided by [`transition`], which can be exercised on its own.
//!
//! # Partition law
//!
//! Concatenating `open + content + close` for every span, in order, yields the
//! scanned text exactly:
//!
//! ```ignore
//! let text = "int a = 1; // one\n";
//! let rebuilt: String = scan(text).iter().map(|s| s.to_source()).collect();
//! assert_eq!(rebuilt, text);
//! ```
//!
//! # Unterminated constructs
//!
//! A string, char literal or block comment still open at end of input is
//! emitted as [`SpanKind::Code`], so a file whose delimiters are already
//! unbalanced is never sent to a translator. A line comment running into end
//! of input is a regular [`SpanKind::LineComment`].

/// Classification of a scanned span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Source code, copied verbatim
    Code,
    /// `// ...` up to (not including) the newline
    LineComment,
    /// `/* ... */`, including `/** ... */` doc comments
    BlockComment,
    /// `"..."`
    StringLiteral,
    /// `'...'`, recognized but never translated
    CharLiteral,
}

impl SpanKind {
    /// Whether the span's content is natural-language text worth translating
    pub fn is_translatable(self) -> bool {
        matches!(
            self,
            SpanKind::LineComment | SpanKind::BlockComment | SpanKind::StringLiteral
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(self, SpanKind::LineComment | SpanKind::BlockComment)
    }
}

/// A maximal run of source text with a single classification
///
/// Spans borrow from the scanned text and are never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub kind: SpanKind,
    /// Byte offset of the span (opening delimiter included) in the scanned text
    pub offset: usize,
    /// Opening delimiter (`//`, `/*`, `/**`, `"`, `'`), empty for code
    pub open: &'a str,
    /// Interior text between the delimiters
    pub content: &'a str,
    /// Closing delimiter (`*/`, `"`, `'`), empty for code and line comments
    pub close: &'a str,
}

impl<'a> Span<'a> {
    fn code(offset: usize, content: &'a str) -> Self {
        Span {
            kind: SpanKind::Code,
            offset,
            open: "",
            content,
            close: "",
        }
    }

    /// Total length in bytes, delimiters included
    pub fn len(&self) -> usize {
        self.open.len() + self.content.len() + self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The exact source text this span was scanned from
    pub fn to_source(&self) -> String {
        let mut out = String::with_capacity(self.len());
        self.write_with(self.content, &mut out);
        out
    }

    /// Write the span to `out` with `content` between the original delimiters
    pub fn write_with(&self, content: &str, out: &mut String) {
        out.push_str(self.open);
        out.push_str(content);
        out.push_str(self.close);
    }
}

/// Scanner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Str,
    Char,
    LineComment,
    BlockComment,
}

impl Mode {
    fn span_kind(self) -> SpanKind {
        match self {
            Mode::Normal => SpanKind::Code,
            Mode::Str => SpanKind::StringLiteral,
            Mode::Char => SpanKind::CharLiteral,
            Mode::LineComment => SpanKind::LineComment,
            Mode::BlockComment => SpanKind::BlockComment,
        }
    }
}

/// A mode change triggered by a delimiter starting at the current position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub to: Mode,
    /// Bytes consumed by the delimiter; zero when the delimiter belongs to the
    /// next span (the newline ending a line comment)
    pub delimiter_len: usize,
}

impl Transition {
    const fn new(to: Mode, delimiter_len: usize) -> Self {
        Transition { to, delimiter_len }
    }
}

/// Transition table of the scanner
///
/// Returns the transition taken in `mode` when reading `bytes[pos]`, or `None`
/// when the byte is ordinary content of the current span. `region_start` is
/// the first byte backslash runs may be counted from (the start of the
/// current code run or literal interior).
pub fn transition(mode: Mode, bytes: &[u8], pos: usize, region_start: usize) -> Option<Transition> {
    let current = *bytes.get(pos)?;
    let next = bytes.get(pos + 1).copied();

    match (mode, current, next) {
        (Mode::Normal, b'/', Some(b'/')) => Some(Transition::new(Mode::LineComment, 2)),
        (Mode::Normal, b'/', Some(b'*')) => Some(Transition::new(
            Mode::BlockComment,
            block_open_len(bytes, pos),
        )),
        (Mode::Normal, b'"', _) if !is_escaped(bytes, pos, region_start) => {
            Some(Transition::new(Mode::Str, 1))
        }
        (Mode::Normal, b'\'', _) => Some(Transition::new(Mode::Char, 1)),
        (Mode::Str, b'"', _) if !is_escaped(bytes, pos, region_start) => {
            Some(Transition::new(Mode::Normal, 1))
        }
        (Mode::Char, b'\'', _) if !is_escaped(bytes, pos, region_start) => {
            Some(Transition::new(Mode::Normal, 1))
        }
        (Mode::LineComment, b'\n' | b'\r', _) => Some(Transition::new(Mode::Normal, 0)),
        (Mode::BlockComment, b'*', Some(b'/')) => Some(Transition::new(Mode::Normal, 2)),
        _ => None,
    }
}

/// Length of a block comment opener at `pos`: `/**` keeps its doc marker,
/// except for the empty comment `/**/`.
fn block_open_len(bytes: &[u8], pos: usize) -> usize {
    let doc_marker = bytes.get(pos + 2) == Some(&b'*');
    let closes_immediately = bytes.get(pos + 3) == Some(&b'/');
    if doc_marker && !closes_immediately { 3 } else { 2 }
}

/// A delimiter is escaped iff it is preceded by an odd run of backslashes
pub fn is_escaped(bytes: &[u8], pos: usize, region_start: usize) -> bool {
    let run = bytes[region_start..pos]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    run % 2 == 1
}

/// Scan `text` into an ordered, lossless sequence of spans
///
/// Total over any input: malformed or unterminated constructs degrade to code.
pub fn scan(text: &str) -> Vec<Span<'_>> {
    Scanner::new(text).run()
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    mode: Mode,
    pos: usize,
    /// Start of the current span, opening delimiter included
    span_start: usize,
    /// Start of the current span's interior
    content_start: usize,
    spans: Vec<Span<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Scanner {
            text,
            bytes: text.as_bytes(),
            mode: Mode::Normal,
            pos: 0,
            span_start: 0,
            content_start: 0,
            spans: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Span<'a>> {
        while self.pos < self.bytes.len() {
            let region_start = match self.mode {
                Mode::Normal => self.span_start,
                _ => self.content_start,
            };
            match transition(self.mode, self.bytes, self.pos, region_start) {
                Some(t) => self.apply(t),
                None => self.pos += 1,
            }
        }
        self.finish()
    }

    fn apply(&mut self, t: Transition) {
        if self.mode == Mode::Normal {
            // Opening delimiter: flush pending code and enter the construct
            self.push_code(self.span_start, self.pos);
            self.span_start = self.pos;
            self.content_start = self.pos + t.delimiter_len;
            self.pos = self.content_start;
        } else {
            let close_end = self.pos + t.delimiter_len;
            self.spans.push(Span {
                kind: self.mode.span_kind(),
                offset: self.span_start,
                open: &self.text[self.span_start..self.content_start],
                content: &self.text[self.content_start..self.pos],
                close: &self.text[self.pos..close_end],
            });
            self.span_start = close_end;
            self.pos = close_end;
        }
        self.mode = t.to;
    }

    fn finish(mut self) -> Vec<Span<'a>> {
        let end = self.bytes.len();
        match self.mode {
            Mode::LineComment => self.spans.push(Span {
                kind: SpanKind::LineComment,
                offset: self.span_start,
                open: &self.text[self.span_start..self.content_start],
                content: &self.text[self.content_start..end],
                close: "",
            }),
            // Unterminated literals and block comments stay untouched
            Mode::Normal | Mode::Str | Mode::Char | Mode::BlockComment => {
                self.push_code(self.span_start, end)
            }
        }
        self.spans
    }

    /// Emit `text[start..end]` as code, merging with a preceding code span
    fn push_code(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.kind == SpanKind::Code && last.offset + last.len() == start => {
                last.content = &self.text[last.offset..end];
            }
            _ => self.spans.push(Span::code(start, &self.text[start..end])),
        }
    }
}

/// Rebuild source text from spans (inverse of [`scan`])
pub fn reassemble(spans: &[Span<'_>]) -> String {
    let mut out = String::with_capacity(spans.iter().map(Span::len).sum());
    for span in spans {
        span.write_with(span.content, &mut out);
    }
    out
}
