//! The single-pass rewrite engine.
//!
//! One [`Translator`] processes one source file. Input arrives in chunks of
//! any size (the driver feeds lines); output is the input byte stream with
//! exactly three kinds of edit: the runtime header prepended, elided
//! identifiers dropped, and routine braces replaced by entry/exit calls.
//!
//! The engine is a heuristic structural scanner, not a parser. It keeps a
//! stack of open blocks rooted in a declaration block for the whole file, a
//! rolling list of recently read tokens, and a punctuation-qualifier
//! accumulator. A `(` turns the recent tokens into a speculative signature
//! *candidate* hung off the innermost block; `;` discards the candidate (it
//! was a prototype), `{` commits it to the stack and, for functions and
//! methods, swaps the brace for the entry call. The matching `}` pops it
//! and swaps in the exit call.
//!
//! Comments, string/char literals and directive lines are opaque spans
//! (see [`crate::scan`]); a span whose terminator has not arrived yet is
//! carried, unemitted, into the next chunk and re-scanned, so output is
//! byte-identical no matter how the input was chunked. Bytes inside a
//! disabled conditional branch are copied through with no structural
//! interpretation at all. Braces there are invisible to the stack; sources
//! that rely on that passthrough keep working, so it stays that way.

use std::io::{BufRead, Write};

use log::debug;

use crate::block::{branch_enabled, Block, BlockKind, Param};
use crate::domain::errors::TranslateError;
use crate::domain::types::FileContext;
use crate::inject;
use crate::preprocessor::DirectiveSet;
use crate::scan::{self, Opener, Search, Span, SpanKind};

/// Outcome of reading one token: the index after it, or a suspension
/// because the token (or its elision lookahead) ran into the chunk end.
enum Token {
    Done(usize),
    Suspended,
}

pub struct Translator<W: Write> {
    ctx: FileContext,
    out: W,
    directives: DirectiveSet,
    stack: Vec<Block>,
    /// Rolling identifier history, reset by structural events.
    tokens: Vec<String>,
    /// Accumulated `*`/`:` punctuation since the last structural reset.
    qualifier: String,
    /// Next token is an initializer name, not a parameter.
    skip_next_token: bool,
    /// Span still waiting for its terminator.
    span: Option<Span>,
    /// Unprocessed tail of the previous chunk.
    carry: Vec<u8>,
    /// 1-based input line, advanced as input bytes are emitted.
    line: usize,
}

impl<W: Write> Translator<W> {
    /// Create a translator for one file and write the runtime header.
    pub fn new(ctx: FileContext, mut out: W) -> Result<Self, TranslateError> {
        out.write_all(inject::header_line().as_bytes())?;
        let root = Block::root(&ctx.class);
        Ok(Translator {
            ctx,
            out,
            directives: DirectiveSet::new(),
            stack: vec![root],
            tokens: Vec::new(),
            qualifier: String::new(),
            skip_next_token: false,
            span: None,
            carry: Vec::new(),
            line: 1,
        })
    }

    /// Process one chunk of input. Chunk boundaries are invisible in the
    /// output: state that cannot be resolved yet is carried forward.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), TranslateError> {
        if self.carry.is_empty() {
            return self.scan(chunk, false);
        }
        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(chunk);
        self.scan(&buf, false)
    }

    /// Flush remaining state and return the writer. A span still open at
    /// end of input is an error naming its kind and start line.
    pub fn finish(mut self) -> Result<W, TranslateError> {
        if let Some(span) = self.span {
            return Err(TranslateError::Unterminated {
                what: span.kind.describe(),
                line: span.start_line,
            });
        }
        if !self.carry.is_empty() {
            let buf = std::mem::take(&mut self.carry);
            self.scan(&buf, true)?;
            if let Some(span) = self.span {
                return Err(TranslateError::Unterminated {
                    what: span.kind.describe(),
                    line: span.start_line,
                });
            }
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn scan(&mut self, buf: &[u8], at_eof: bool) -> Result<(), TranslateError> {
        let mut i = 0;
        while i < buf.len() {
            // A span in progress swallows everything up to its terminator.
            if let Some(span) = self.span {
                match scan::find_terminator(&buf[i..], span.kind, span.from) {
                    Search::Found(end) => {
                        self.close_span(span, &buf[i..i + end])?;
                        self.span = None;
                        i += end;
                    }
                    Search::Partial(resume) => {
                        self.span = Some(Span { from: resume, ..span });
                        self.carry = buf[i..].to_vec();
                        return Ok(());
                    }
                }
                continue;
            }

            match scan::classify_opener(buf, i) {
                Opener::Span(kind) => {
                    self.span = Some(Span::open(kind, self.line));
                    continue;
                }
                Opener::NeedMore if !at_eof => {
                    self.carry = buf[i..].to_vec();
                    return Ok(());
                }
                // A lone '/' at end of input is ordinary division.
                Opener::NeedMore | Opener::None => {}
            }

            // Disabled conditional branch: verbatim copy, no tracking.
            if !branch_enabled(&self.stack) {
                self.emit_input(&buf[i..=i])?;
                i += 1;
                continue;
            }

            if scan::is_token_start(buf[i]) {
                match self.read_token(buf, i, at_eof)? {
                    Token::Done(next) => i = next,
                    Token::Suspended => return Ok(()),
                }
                continue;
            }

            i = self.structural(buf, i)?;
        }
        Ok(())
    }

    /// Emit a completed span and apply its side effects: sentinel comments
    /// set the skip flags, directive lines drive the conditional stack.
    fn close_span(&mut self, span: Span, text: &[u8]) -> Result<(), TranslateError> {
        match span.kind {
            SpanKind::BlockComment => {
                if text == inject::SKIP_FUNCTION_MARK {
                    self.ctx.skip_next = true;
                } else if text == inject::SKIP_FILE_MARK {
                    self.ctx.skip_all = true;
                }
            }
            SpanKind::Directive => {
                let line_text = String::from_utf8_lossy(text);
                self.directives.evaluate(&line_text, &mut self.stack, &mut self.ctx, self.line);
            }
            SpanKind::LineComment | SpanKind::Str | SpanKind::Char => {}
        }
        self.emit_input(text)
    }

    /// Read one identifier-like token (`~` admits destructor names) and run
    /// the token rules: elision, class detection, history push.
    fn read_token(&mut self, buf: &[u8], start: usize, at_eof: bool) -> Result<Token, TranslateError> {
        let mut end = start + 1;
        while end < buf.len() && scan::is_token_byte(buf[end]) {
            end += 1;
        }
        if end == buf.len() && !at_eof {
            // The token may continue in the next chunk.
            self.carry = buf[start..].to_vec();
            return Ok(Token::Suspended);
        }
        if buf[start] == b'~' && end == start + 1 {
            // Bare bitwise-not, not a destructor name.
            self.emit_input(&buf[start..end])?;
            return Ok(Token::Done(end));
        }

        let token = String::from_utf8_lossy(&buf[start..end]).into_owned();
        if self.ctx.elide.contains(&token) {
            return self.elide(buf, start, end, at_eof);
        }
        self.emit_input(&buf[start..end])?;

        // `class` already in the history makes this token a class name.
        if self.tokens.iter().any(|t| t == "class") {
            let top = self.top_mut();
            top.candidate = Some(Box::new(Block::class(&token)));
            self.tokens.clear();
        }

        if self.skip_next_token {
            self.skip_next_token = false;
        } else {
            self.tokens.push(token);
        }
        Ok(Token::Done(end))
    }

    /// Drop an elided identifier and, when one directly follows, a simple
    /// `( words, spaces, commas )` argument list.
    fn elide(&mut self, buf: &[u8], start: usize, end: usize, at_eof: bool) -> Result<Token, TranslateError> {
        let mut j = end;
        while j < buf.len() && (buf[j] == b' ' || buf[j] == b'\t') {
            j += 1;
        }
        if j == buf.len() && !at_eof {
            self.carry = buf[start..].to_vec();
            return Ok(Token::Suspended);
        }
        if j < buf.len() && buf[j] == b'(' {
            let mut k = j + 1;
            while k < buf.len()
                && (scan::is_token_byte(buf[k]) || buf[k] == b' ' || buf[k] == b',')
            {
                k += 1;
            }
            if k == buf.len() && !at_eof {
                self.carry = buf[start..].to_vec();
                return Ok(Token::Suspended);
            }
            if k < buf.len() && buf[k] == b')' {
                return Ok(Token::Done(k + 1));
            }
        }
        // No simple argument list: only the identifier is dropped.
        Ok(Token::Done(end))
    }

    /// Handle one structural byte and return the index after it.
    fn structural(&mut self, buf: &[u8], i: usize) -> Result<usize, TranslateError> {
        match buf[i] {
            b'{' => self.open_brace()?,
            b'}' => self.close_brace()?,
            b'(' => {
                self.open_paren()?;
                self.emit_input(b"(")?;
            }
            b')' | b',' => {
                self.close_param(buf[i]);
                self.emit_input(&buf[i..=i])?;
            }
            b';' => {
                // A prototype, not a definition: the candidate dies.
                self.top_mut().candidate = None;
                self.emit_input(b";")?;
            }
            b'=' => {
                self.assign();
                self.emit_input(b"=")?;
            }
            b'*' => {
                if self.collecting_args() {
                    self.qualifier.push('*');
                }
                self.emit_input(b"*")?;
            }
            b'[' => {
                // Array parameters read as an extra pointer qualifier.
                if self.collecting_args() {
                    self.qualifier.push('*');
                }
                self.emit_input(b"[")?;
            }
            b':' => {
                self.qualifier.push(':');
                self.emit_input(b":")?;
            }
            _ => self.emit_input(&buf[i..=i])?,
        }
        Ok(i + 1)
    }

    /// `{`: commit the pending candidate (or an anonymous statement block)
    /// and inject the entry call for routines.
    fn open_brace(&mut self) -> Result<(), TranslateError> {
        match self.top_mut().candidate.take() {
            Some(boxed) => {
                let mut block = *boxed;
                if block.is_routine() {
                    if self.ctx.skip_next || self.ctx.skip_all {
                        self.ctx.skip_next = false;
                        block.skipped = true;
                        self.emit_input(b"{")?;
                    } else {
                        debug!(
                            "instrumenting {}::{} on line {}",
                            block.class_name, block.name, self.line
                        );
                        let text = inject::entry_text(&self.ctx, &block);
                        self.emit_text(text.as_bytes())?;
                    }
                } else {
                    self.emit_input(b"{")?;
                }
                self.stack.push(block);
            }
            None => {
                self.stack.push(Block::statement());
                self.emit_input(b"{")?;
            }
        }
        Ok(())
    }

    /// `}`: pop the innermost block and inject the exit call for routines.
    fn close_brace(&mut self) -> Result<(), TranslateError> {
        if self.stack.len() < 2 {
            return Err(TranslateError::Malformed {
                line: self.line,
                what: "unbalanced '}' at file scope".to_string(),
            });
        }
        let block = self.stack.pop().expect("stack length checked above");
        if block.is_routine() && !block.skipped {
            let text = inject::exit_text(&self.ctx, &block);
            self.emit_text(text.as_bytes())?;
        } else {
            self.emit_input(b"}")?;
        }
        Ok(())
    }

    /// `(`: with no candidate pending, speculate a signature from the token
    /// history and the environment (the innermost non-conditional block).
    fn open_paren(&mut self) -> Result<(), TranslateError> {
        if self.top().candidate.is_none() {
            let (env_kind, env_name) = {
                let env = self.environment();
                (env.kind, env.name.clone())
            };
            let candidate = match env_kind {
                BlockKind::Declaration => {
                    if self.qualifier == "::" {
                        // Out-of-line method: Class::name(...)
                        let name = self.recent_token(1)?.to_string();
                        let class = self.recent_token(2)?.to_string();
                        Block::method(&name, &class)
                    } else {
                        let name = self.recent_token(1)?.to_string();
                        Block::function(&name, &env_name)
                    }
                }
                BlockKind::Class => {
                    let name = self.recent_token(1)?.to_string();
                    Block::method(&name, &env_name)
                }
                _ => Block::statement(),
            };
            self.top_mut().candidate = Some(Box::new(candidate));
        }
        self.tokens.clear();
        self.qualifier.clear();
        Ok(())
    }

    /// `,`/`)`: finalize one parameter when two tokens were collected since
    /// the last separator; `)` freezes the list. A statement candidate does
    /// not survive an argument separator.
    fn close_param(&mut self, byte: u8) {
        self.skip_next_token = false;

        let param = if self.tokens.len() > 1 {
            let name = self.tokens[self.tokens.len() - 1].clone();
            let ty = format!("{}{}", self.tokens[self.tokens.len() - 2], self.qualifier);
            Some(Param { name, ty })
        } else {
            None
        };

        let top = self.top_mut();
        if top.candidate.is_none() {
            return;
        }
        let routine = top.candidate.as_deref().is_some_and(Block::is_routine);
        if routine {
            if let Some(cand) = top.candidate.as_deref_mut() {
                if let Some(args) = cand.collecting.as_mut() {
                    if let Some(p) = param {
                        args.push(p);
                    }
                }
                if byte == b')' {
                    if let Some(args) = cand.collecting.take() {
                        cand.params = args;
                    }
                }
            }
        } else {
            top.candidate = None;
        }
        self.qualifier.clear();
        self.tokens.clear();
    }

    /// `=`: inside an open parameter list the next token is a default
    /// value, not a parameter; elsewhere it starts a statement candidate
    /// (member initializers are not methods).
    fn assign(&mut self) {
        if self.collecting_args() {
            self.skip_next_token = true;
            return;
        }
        let top = self.top_mut();
        if top.candidate.is_none() {
            top.candidate = Some(Box::new(Block::statement()));
        }
    }

    fn collecting_args(&self) -> bool {
        self.top()
            .candidate
            .as_deref()
            .is_some_and(|c| c.collecting.is_some())
    }

    /// The innermost block that is not a conditional group; the stack root
    /// guarantees one exists.
    fn environment(&self) -> &Block {
        self.stack
            .iter()
            .rev()
            .find(|b| b.kind != BlockKind::Conditional)
            .expect("stack holds the declaration root")
    }

    fn top(&self) -> &Block {
        self.stack.last().expect("stack holds the declaration root")
    }

    fn top_mut(&mut self) -> &mut Block {
        self.stack.last_mut().expect("stack holds the declaration root")
    }

    fn recent_token(&self, back: usize) -> Result<&str, TranslateError> {
        self.tokens
            .len()
            .checked_sub(back)
            .map(|i| self.tokens[i].as_str())
            .ok_or_else(|| TranslateError::Malformed {
                line: self.line,
                what: "'(' with no preceding name".to_string(),
            })
    }

    /// Write input bytes through, advancing the line counter.
    fn emit_input(&mut self, bytes: &[u8]) -> Result<(), TranslateError> {
        self.line += bytes.iter().filter(|&&b| b == b'\n').count();
        self.out.write_all(bytes)?;
        Ok(())
    }

    /// Write injected text; does not advance the input line counter.
    fn emit_text(&mut self, bytes: &[u8]) -> Result<(), TranslateError> {
        self.out.write_all(bytes)?;
        Ok(())
    }
}

/// Rewrite a whole stream, feeding the translator line by line.
pub fn translate<R: BufRead, W: Write>(
    ctx: FileContext,
    mut input: R,
    output: W,
) -> Result<W, TranslateError> {
    let mut translator = Translator::new(ctx, output)?;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = input.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        translator.feed(&buf)?;
    }
    translator.finish()
}
