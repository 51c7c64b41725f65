//! Lexer for the pattern language.
//!
//! Produces span-based tokens without storing text - text is sliced from
//! source only when needed.
//!
//! ## Error handling
//!
//! Consecutive unrecognized characters coalesce into single `Garbage`
//! tokens rather than producing one error per character; the parser turns
//! a `Garbage` token into a syntax error pointing at its offset.

use logos::Logos;
use std::ops::Range;
use text_size::TextRange;

/// Token kinds, derived with Logos.
///
/// Newlines are ordinary whitespace. Commas are *not* trivia: the count
/// quantifier forms `{m,n}` / `{,n}` need to see them, so the parser skips
/// them as separators instead.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token("|")]
    Pipe,

    #[token("?")]
    Question,

    /// Lazy `??`
    #[token("??")]
    QuestionQuestion,

    /// Possessive `?+`
    #[token("?+")]
    QuestionPlus,

    #[token("*")]
    Star,

    /// Lazy `*?`
    #[token("*?")]
    StarQuestion,

    /// Possessive `*+`
    #[token("*+")]
    StarPlus,

    #[token("+")]
    Plus,

    /// Lazy `+?`
    #[token("+?")]
    PlusQuestion,

    /// Possessive `++`
    #[token("++")]
    PlusPlus,

    /// Sequence filler / object remnant descent.
    #[token("...")]
    #[token("\u{2026}")]
    Ellipsis,

    /// Deep-descent breadcrumb.
    #[token("**")]
    StarStar,

    #[token(".")]
    Dot,

    /// Flow arrow into a bucket.
    #[token("->")]
    #[token("\u{2192}")]
    Arrow,

    #[token("#")]
    Hash,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    #[token("<=")]
    Le,

    #[token(">=")]
    Ge,

    #[token("==")]
    EqEq,

    #[token("!=")]
    BangEq,

    #[token("&&")]
    AndAnd,

    #[token("||")]
    OrOr,

    #[token("!")]
    Bang,

    #[token("=")]
    Eq,

    #[token("-")]
    Minus,

    #[token("%")]
    Percent,

    #[token("@")]
    At,

    /// `$name` scalar variable.
    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*")]
    Var,

    /// `@name` array-slice name.
    #[regex(r"@[A-Za-z_][A-Za-z0-9_]*")]
    AtName,

    /// `%name` object-slice name.
    #[regex(r"%[A-Za-z_][A-Za-z0-9_]*")]
    PercentName,

    /// `§name` label declaration.
    #[regex(r"\u{00A7}[A-Za-z_][A-Za-z0-9_]*")]
    SectName,

    /// `^name` label reference.
    #[regex(r"\^[A-Za-z_][A-Za-z0-9_]*")]
    CaretName,

    #[token("else")]
    KwElse,

    #[token("as")]
    KwAs,

    #[token("where")]
    KwWhere,

    #[token("each")]
    KwEach,

    #[token("collecting")]
    KwCollecting,

    #[token("in")]
    KwIn,

    #[token("across")]
    KwAcross,

    #[token("true")]
    KwTrue,

    #[token("false")]
    KwFalse,

    #[token("null")]
    KwNull,

    #[token("_string")]
    KwAnyString,

    #[token("_number")]
    KwAnyNumber,

    #[token("_boolean")]
    KwAnyBoolean,

    #[token("_", priority = 3)]
    Underscore,

    #[regex(r"-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    Number,

    /// Quoted string with escapes, optional `/i` suffix for
    /// case-insensitive matching.
    #[regex(r#""(?:[^"\\\n]|\\.)*"(?:/i)?"#)]
    String,

    #[regex(r"//[^\n]*", allow_greedy = true)]
    LineComment,

    /// Regex literal `/body/flags`. The body is non-empty and cannot start
    /// with `/`, so line comments win on `//`.
    #[regex(r"/(?:[^/\\\n]|\\.)+/[A-Za-z]*")]
    Regex,

    /// Bareword identifier (matched as a string).
    /// Defined after keywords so they take precedence.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    /// Coalesced unrecognized characters.
    Garbage,
    /// Sentinel returned past the end of the token stream.
    Eof,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::LineComment)
    }
}

/// Zero-copy token: kind + span, text retrieved via [`token_text`] when needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: TextRange,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, span: TextRange) -> Self {
        Self { kind, span }
    }
}

fn range_to_text_range(range: Range<usize>) -> TextRange {
    TextRange::new((range.start as u32).into(), (range.end as u32).into())
}

/// Tokenizes source into a vector of span-based tokens.
///
/// Coalesces consecutive lexer errors into single `Garbage` tokens.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    let mut error_start: Option<usize> = None;

    loop {
        match lexer.next() {
            Some(Ok(kind)) => {
                if let Some(start) = error_start.take() {
                    let end = lexer.span().start;
                    tokens.push(Token::new(
                        TokenKind::Garbage,
                        range_to_text_range(start..end),
                    ));
                }
                tokens.push(Token::new(kind, range_to_text_range(lexer.span())));
            }
            Some(Err(())) => {
                if error_start.is_none() {
                    error_start = Some(lexer.span().start);
                }
            }
            None => {
                if let Some(start) = error_start.take() {
                    tokens.push(Token::new(
                        TokenKind::Garbage,
                        range_to_text_range(start..source.len()),
                    ));
                }
                break;
            }
        }
    }

    tokens
}

/// Retrieves the text slice for a token. O(1) slice into source.
#[inline]
pub fn token_text<'q>(source: &'q str, token: &Token) -> &'q str {
    &source[std::ops::Range::<usize>::from(token.span)]
}
