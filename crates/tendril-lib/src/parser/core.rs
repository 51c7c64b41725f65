//! Parser state machine and low-level operations.
//!
//! Recursive descent with ordered-choice backtracking: a speculative
//! branch runs under [`Parser::attempt`], which takes a savepoint and
//! restores it on failure. Once a branch calls [`Parser::commit`] (a
//! "cut"), later failures propagate instead of backtracking, keeping
//! errors local to the construct that owns them.
//!
//! Failures themselves carry no payload. A running farthest-failure
//! record - deepest token reached, the names expected there, the rule
//! stack at that point - produces the final syntax error.

#[cfg(debug_assertions)]
use std::cell::Cell;

use text_size::{TextRange, TextSize};

use super::lexer::{Token, TokenKind, token_text};
use crate::CompileError;

/// Maximum nesting depth. Patterns nest via containers and groups;
/// this bounds stack growth on hostile input.
const MAX_DEPTH: u32 = 256;

/// Debug-mode progress detector. Decremented on lookahead, reset on `bump()`.
/// Catches grammar rules that loop without consuming input.
#[cfg(debug_assertions)]
const DEBUG_FUEL: u32 = 1024;

/// A parse failure signal.
///
/// `Soft` failures may be caught by an enclosing [`Parser::attempt`];
/// `Hard` failures propagate to the caller (cut passed, or fatal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fail {
    Soft,
    Hard,
}

pub(crate) type PResult<T> = Result<T, Fail>;

/// The deepest failure seen so far, for error reporting.
#[derive(Debug, Default)]
struct Farthest {
    pos: usize,
    expected: Vec<&'static str>,
    context: Vec<&'static str>,
}

pub struct Parser<'src> {
    pub(crate) source: &'src str,
    tokens: Vec<Token>,
    pub(crate) pos: usize,
    /// Set by `commit()`; consulted by `attempt()` to decide whether a
    /// failure may backtrack.
    cut: bool,
    farthest: Farthest,
    context: Vec<&'static str>,
    /// A non-recoverable error with its own message, e.g. mixed `|`/`else`.
    fatal: Option<(String, TextRange)>,
    depth: u32,
    #[cfg(debug_assertions)]
    debug_fuel: Cell<u32>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        // Trivia never reaches the grammar; spans survive in the kept tokens.
        let tokens = tokens.into_iter().filter(|t| !t.kind.is_trivia()).collect();
        Self {
            source,
            tokens,
            pos: 0,
            cut: false,
            farthest: Farthest::default(),
            context: Vec::new(),
            fatal: None,
            depth: 0,
            #[cfg(debug_assertions)]
            debug_fuel: Cell::new(DEBUG_FUEL),
        }
    }

    // --- Token access ---

    /// Current token kind. Returns `Eof` past the end.
    pub(crate) fn current(&self) -> TokenKind {
        self.nth(0)
    }

    pub(crate) fn nth(&self, lookahead: usize) -> TokenKind {
        #[cfg(debug_assertions)]
        {
            if self.debug_fuel.get() == 0 {
                panic!("parser is stuck: no progress in {DEBUG_FUEL} lookaheads");
            }
            self.debug_fuel.set(self.debug_fuel.get() - 1);
        }
        self.tokens
            .get(self.pos + lookahead)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn current_span(&self) -> TextRange {
        self.tokens
            .get(self.pos)
            .map_or_else(|| TextRange::empty(self.eof_offset()), |t| t.span)
    }

    fn eof_offset(&self) -> TextSize {
        TextSize::from(self.source.len() as u32)
    }

    pub(crate) fn current_text(&self) -> &'src str {
        self.tokens
            .get(self.pos)
            .map_or("", |t| token_text(self.source, t))
    }

    /// End offset of the most recently consumed token.
    pub(crate) fn prev_end(&self) -> TextSize {
        if self.pos == 0 {
            return TextSize::from(0);
        }
        self.tokens[self.pos - 1].span.end()
    }

    /// Consume the current token, returning it.
    pub(crate) fn bump(&mut self) -> Token {
        debug_assert!(!self.eof(), "bump called at EOF");
        #[cfg(debug_assertions)]
        self.debug_fuel.set(DEBUG_FUEL);
        let token = self.tokens[self.pos];
        self.pos += 1;
        token
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &'static str) -> PResult<Token> {
        if self.at(kind) {
            return Ok(self.bump());
        }
        self.fail(what)
    }

    /// Commas are insignificant separators everywhere except inside
    /// `{m,n}` counts, which read them explicitly.
    pub(crate) fn skip_commas(&mut self) {
        while self.at(TokenKind::Comma) {
            self.bump();
        }
    }

    // --- Backtracking ---

    /// Runs `f` speculatively. On a soft failure with no cut taken, the
    /// parser rewinds and `Ok(None)` is returned; otherwise the failure
    /// propagates as `Hard`.
    pub(crate) fn attempt<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<Option<T>> {
        let saved_pos = self.pos;
        let saved_cut = self.cut;
        self.cut = false;
        match f(self) {
            Ok(value) => {
                self.cut = saved_cut;
                Ok(Some(value))
            }
            Err(Fail::Soft) if !self.cut => {
                self.pos = saved_pos;
                self.cut = saved_cut;
                Ok(None)
            }
            Err(_) => Err(Fail::Hard),
        }
    }

    /// Cut: the current speculative branch is committed. Failures after
    /// this point abort instead of backtracking.
    pub(crate) fn commit(&mut self) {
        self.cut = true;
    }

    /// Records a failure expecting `what` at the current position.
    pub(crate) fn fail<T>(&mut self, what: &'static str) -> PResult<T> {
        if self.pos > self.farthest.pos {
            self.farthest.pos = self.pos;
            self.farthest.expected.clear();
            self.farthest.expected.push(what);
            self.farthest.context = self.context.clone();
        } else if self.pos == self.farthest.pos && !self.farthest.expected.contains(&what) {
            self.farthest.expected.push(what);
        }
        Err(Fail::Soft)
    }

    /// Raises a non-recoverable failure with its own message and span.
    pub(crate) fn fail_fatal<T>(&mut self, message: impl Into<String>, span: TextRange) -> PResult<T> {
        if self.fatal.is_none() {
            self.fatal = Some((message.into(), span));
        }
        Err(Fail::Hard)
    }

    /// Pushes a named rule onto the context stack for the duration of `f`.
    pub(crate) fn with_context<T>(
        &mut self,
        name: &'static str,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        self.context.push(name);
        let result = f(self);
        self.context.pop();
        result
    }

    // --- Recursion guard ---

    pub(crate) fn enter_recursion(&mut self) -> PResult<()> {
        if self.depth >= MAX_DEPTH {
            let span = self.current_span();
            return self.fail_fatal("pattern nested too deeply", span);
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // --- Error construction ---

    /// Builds the final syntax error from the farthest-failure record.
    pub(crate) fn into_syntax_error(self) -> CompileError {
        if let Some((message, span)) = self.fatal {
            return CompileError::Syntax { message, span };
        }

        let at = self.tokens.get(self.farthest.pos);
        let span = at.map_or_else(|| TextRange::empty(self.eof_offset()), |t| t.span);

        let found = match at {
            None => "end of pattern".to_owned(),
            Some(t) if t.kind == TokenKind::Garbage => {
                let text = token_text(self.source, t);
                let message = match text.chars().next() {
                    Some('"') => "unterminated string literal".to_owned(),
                    Some('/') => "unterminated or invalid regex".to_owned(),
                    _ => format!("unexpected characters `{text}`"),
                };
                return CompileError::Syntax { message, span };
            }
            Some(t) => format!("`{}`", token_text(self.source, t)),
        };

        let mut message = String::from("expected ");
        match self.farthest.expected.as_slice() {
            [] => message.push_str("a pattern"),
            [only] => message.push_str(only),
            [init @ .., last] => {
                message.push_str(&init.join(", "));
                message.push_str(" or ");
                message.push_str(last);
            }
        }
        message.push_str(&format!(", found {found}"));
        if let Some(rule) = self.farthest.context.last() {
            message.push_str(&format!(" while parsing {rule}"));
        }
        CompileError::Syntax { message, span }
    }
}
