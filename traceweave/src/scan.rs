//! Lexical classification and span termination.
//!
//! The rewriter treats comments, string/character literals and preprocessor
//! lines as opaque *spans*: once opened, a span is copied through verbatim up
//! to and including its terminator, with no structural interpretation of the
//! bytes in between. This module decides where spans begin and where they
//! end, including the case where the terminator has not been read yet and
//! the search must suspend until more input arrives.

/// The span-opening categories recognized at the current byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opener {
    /// The byte starts a span of the given kind.
    Span(SpanKind),
    /// A `/` at the end of the buffer: cannot distinguish a comment opener
    /// from plain division until the next byte is available.
    NeedMore,
    /// Not a span opener.
    None,
}

/// Kinds of opaque span, each with a fixed terminator sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// `#...` up to the end of the line.
    Directive,
    /// `//...` up to the end of the line.
    LineComment,
    /// `/*...*/`.
    BlockComment,
    /// `"..."` with backslash escapes.
    Str,
    /// `'...'` with backslash escapes.
    Char,
}

impl SpanKind {
    /// The byte sequence that closes this span.
    pub fn terminator(self) -> &'static [u8] {
        match self {
            SpanKind::Directive | SpanKind::LineComment => b"\n",
            SpanKind::BlockComment => b"*/",
            SpanKind::Str => b"\"",
            SpanKind::Char => b"'",
        }
    }

    /// Length of the opening sequence; the terminator search starts after it
    /// so that e.g. the opening quote does not terminate its own span.
    pub fn opener_len(self) -> usize {
        match self {
            SpanKind::LineComment | SpanKind::BlockComment => 2,
            SpanKind::Directive | SpanKind::Str | SpanKind::Char => 1,
        }
    }

    /// Whether a backslash in front of the terminator escapes it.
    fn escapes(self) -> bool {
        matches!(self, SpanKind::Str | SpanKind::Char)
    }

    /// Human-readable name for error reporting.
    pub fn describe(self) -> &'static str {
        match self {
            SpanKind::Directive => "preprocessor directive",
            SpanKind::LineComment => "line comment",
            SpanKind::BlockComment => "block comment",
            SpanKind::Str => "string literal",
            SpanKind::Char => "character literal",
        }
    }
}

/// A span in progress. `from` is the offset within the span text where the
/// terminator search (re)starts; it advances past escaped terminators and,
/// on suspension, past everything that cannot contain the terminator start.
#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub kind: SpanKind,
    pub from: usize,
    pub start_line: usize,
}

impl Span {
    pub fn open(kind: SpanKind, start_line: usize) -> Self {
        Span { kind, from: kind.opener_len(), start_line }
    }
}

/// Result of a terminator search over the currently buffered span text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    /// Terminator found; the value is the span length including it.
    Found(usize),
    /// Not buffered yet; the value is the offset to resume the search from
    /// once more input has been appended.
    Partial(usize),
}

/// Classify the byte at `at` as a span opener, if it is one.
pub fn classify_opener(buf: &[u8], at: usize) -> Opener {
    match buf[at] {
        b'#' => Opener::Span(SpanKind::Directive),
        b'"' => Opener::Span(SpanKind::Str),
        b'\'' => Opener::Span(SpanKind::Char),
        b'/' => match buf.get(at + 1) {
            Some(b'/') => Opener::Span(SpanKind::LineComment),
            Some(b'*') => Opener::Span(SpanKind::BlockComment),
            Some(_) => Opener::None,
            None => Opener::NeedMore,
        },
        _ => Opener::None,
    }
}

/// First byte of an identifier-like token (`~` admits destructor names).
pub fn is_token_start(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'~'
}

/// Continuation byte of an identifier-like token.
pub fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Search `text` (the span content from its opening byte) for the span's
/// terminator, starting at `from`.
///
/// Quote terminators preceded by an odd run of backslashes are escaped and
/// skipped; an even run means the backslashes escape each other and the
/// quote closes the span.
pub fn find_terminator(text: &[u8], kind: SpanKind, from: usize) -> Search {
    let term = kind.terminator();
    let mut at = from.max(kind.opener_len());
    loop {
        match find(text, term, at) {
            Some(pos) => {
                if kind.escapes() && escaped(text, pos) {
                    at = pos + 1;
                    continue;
                }
                return Search::Found(pos + term.len());
            }
            None => {
                // Keep enough of the tail to re-match a terminator that was
                // split across the chunk boundary.
                let resume = text.len().saturating_sub(term.len() - 1).max(at);
                return Search::Partial(resume);
            }
        }
    }
}

/// Position of `needle` in `hay` at or after `from`.
fn find(hay: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= hay.len() {
        return None;
    }
    hay[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Whether the byte at `pos` is escaped by the backslash run before it.
fn escaped(text: &[u8], pos: usize) -> bool {
    let run = text[..pos].iter().rev().take_while(|&&b| b == b'\\').count();
    run % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openers() {
        assert_eq!(classify_opener(b"#include", 0), Opener::Span(SpanKind::Directive));
        assert_eq!(classify_opener(b"//x", 0), Opener::Span(SpanKind::LineComment));
        assert_eq!(classify_opener(b"/*x", 0), Opener::Span(SpanKind::BlockComment));
        assert_eq!(classify_opener(b"\"x\"", 0), Opener::Span(SpanKind::Str));
        assert_eq!(classify_opener(b"'x'", 0), Opener::Span(SpanKind::Char));
        assert_eq!(classify_opener(b"a/b", 1), Opener::None);
        assert_eq!(classify_opener(b"a/", 1), Opener::NeedMore);
        assert_eq!(classify_opener(b"x", 0), Opener::None);
    }

    #[test]
    fn test_string_terminator() {
        assert_eq!(find_terminator(b"\"abc\"", SpanKind::Str, 1), Search::Found(5));
        assert_eq!(find_terminator(b"\"abc", SpanKind::Str, 1), Search::Partial(4));
    }

    #[test]
    fn test_escaped_quote_does_not_terminate() {
        // "a\"b" is one literal up to the final quote.
        assert_eq!(find_terminator(br#""a\"b""#, SpanKind::Str, 1), Search::Found(6));
        // "a\\" ends at the last quote: the two backslashes escape each other.
        assert_eq!(find_terminator(br#""a\\""#, SpanKind::Str, 1), Search::Found(5));
        // "a\\\" is still open.
        assert_eq!(
            find_terminator(br#""a\\\""#, SpanKind::Str, 1),
            Search::Partial(6)
        );
    }

    #[test]
    fn test_block_comment_split_terminator() {
        // The '*' may be the start of '*/' finished by the next chunk.
        assert_eq!(
            find_terminator(b"/* abc *", SpanKind::BlockComment, 2),
            Search::Partial(7)
        );
        assert_eq!(
            find_terminator(b"/* abc */", SpanKind::BlockComment, 7),
            Search::Found(9)
        );
    }

    #[test]
    fn test_char_literal_escape() {
        assert_eq!(find_terminator(br"'\''", SpanKind::Char, 1), Search::Found(4));
    }

    #[test]
    fn test_directive_runs_to_newline() {
        assert_eq!(
            find_terminator(b"#define X 1\nint", SpanKind::Directive, 1),
            Search::Found(12)
        );
    }
}
