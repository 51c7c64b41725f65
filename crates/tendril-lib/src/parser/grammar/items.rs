//! Item-level productions: whole patterns, alternation, atoms, groups,
//! and the flow/collect postfix directives.

use text_size::{TextRange, TextSize};

use crate::parser::Parser;
use crate::parser::ast::{Expr, Pat, PatNode, PrimKind, RegexPat, SliceKind};
use crate::parser::core::PResult;
use crate::parser::lexer::TokenKind;
use crate::regex_cache;

impl Parser<'_> {
    /// Whole-pattern entry: a slice-find marker or a plain item pattern.
    pub(crate) fn parse_pattern(&mut self) -> PResult<PatNode> {
        let start = self.start();

        if self.at(TokenKind::Percent) && self.nth(1) == TokenKind::LBrace {
            self.bump();
            self.commit();
            let inner = self.parse_object(None, true)?;
            return Ok(self.node(
                Pat::Slice {
                    kind: SliceKind::Object,
                    pat: Box::new(inner),
                },
                start,
            ));
        }

        if self.at(TokenKind::At) && self.nth(1) == TokenKind::LBracket {
            self.bump();
            self.commit();
            let inner = self.parse_array(None)?;
            return Ok(self.node(
                Pat::Slice {
                    kind: SliceKind::Array,
                    pat: Box::new(inner),
                },
                start,
            ));
        }

        self.parse_alt()
    }

    /// Alternation over quantified elements. `|` is unordered, `else` is
    /// prioritized; the two cannot meet at one level without parentheses.
    pub(crate) fn parse_alt(&mut self) -> PResult<PatNode> {
        let start = self.start();
        let first = self.parse_quantified()?;
        let mut alts = vec![first];
        let mut prioritized: Option<bool> = None;

        loop {
            let by_priority = match self.current() {
                TokenKind::Pipe => false,
                TokenKind::KwElse => true,
                _ => break,
            };
            let sep_span = self.current_span();
            match prioritized {
                None => prioritized = Some(by_priority),
                Some(p) if p != by_priority => {
                    return self.fail_fatal(
                        "cannot mix `|` and `else` at one level; parenthesize",
                        sep_span,
                    );
                }
                Some(_) => {}
            }
            self.bump();
            alts.push(self.parse_quantified()?);
        }

        if alts.len() == 1 {
            return Ok(alts.pop().expect("one alternative"));
        }
        Ok(self.node(
            Pat::Alt {
                alts,
                prioritized: prioritized.unwrap_or(false),
            },
            start,
        ))
    }

    /// An item with its flow/collect directives and an optional trailing
    /// quantifier, in that order: `1 ->@ones{2,}` repeats a flowing match.
    pub(crate) fn parse_quantified(&mut self) -> PResult<PatNode> {
        let start = self.start();
        let mut node = self.parse_item()?;
        node = self.parse_directives(node, start)?;

        if let Some((count, mode)) = self.parse_quantifier()? {
            node = self.node(
                Pat::Quant {
                    pat: Box::new(node),
                    count,
                    mode,
                },
                start,
            );
        }
        Ok(node)
    }

    /// `->@bucket`, `->%bucket<^label>`, `<collecting ...>` postfixes.
    fn parse_directives(&mut self, mut node: PatNode, start: TextSize) -> PResult<PatNode> {
        loop {
            if self.at(TokenKind::Arrow) {
                self.bump();
                self.commit();
                let (bucket, kind) = self.parse_bucket_name()?;
                let label = self.parse_label_ref()?;
                node = self.node(
                    Pat::Flow {
                        pat: Box::new(node),
                        bucket,
                        kind,
                        label,
                    },
                    start,
                );
            } else if self.at(TokenKind::Lt) && self.nth(1) == TokenKind::KwCollecting {
                node = self.parse_collect(node, start)?;
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn parse_bucket_name(&mut self) -> PResult<(String, SliceKind)> {
        match self.current() {
            TokenKind::AtName => {
                let name = self.current_text()[1..].to_owned();
                self.bump();
                Ok((name, SliceKind::Array))
            }
            TokenKind::PercentName => {
                let name = self.current_text()[1..].to_owned();
                self.bump();
                Ok((name, SliceKind::Object))
            }
            _ => self.fail("a bucket name (`@name` or `%name`)"),
        }
    }

    /// Optional `<^label>` suffix on a flow.
    fn parse_label_ref(&mut self) -> PResult<Option<String>> {
        if !(self.at(TokenKind::Lt) && self.nth(1) == TokenKind::CaretName) {
            return Ok(None);
        }
        self.bump();
        let name = self.current_text()[1..].to_owned();
        self.bump();
        self.expect(TokenKind::Gt, "`>`")?;
        Ok(Some(name))
    }

    /// `<collecting $v in @bucket across ^label>` or
    /// `<collecting $k:$v in %bucket across ^label>`.
    fn parse_collect(&mut self, inner: PatNode, start: TextSize) -> PResult<PatNode> {
        self.with_context("a collecting directive", |p| {
            p.bump(); // `<`
            p.bump(); // `collecting`
            p.commit();

            let first = p.expect(TokenKind::Var, "`$variable`")?;
            let first = p.text_of(first)[1..].to_owned();
            let (key, value) = if p.eat(TokenKind::Colon) {
                let value = p.expect(TokenKind::Var, "`$variable`")?;
                (Some(first), p.text_of(value)[1..].to_owned())
            } else {
                (None, first)
            };

            p.expect(TokenKind::KwIn, "`in`")?;
            let (bucket, kind) = p.parse_bucket_name()?;
            p.expect(TokenKind::KwAcross, "`across`")?;
            let label_token = p.expect(TokenKind::CaretName, "`^label`")?;
            let label = p.text_of(label_token)[1..].to_owned();
            p.expect(TokenKind::Gt, "`>`")?;

            Ok(p.node(
                Pat::Collect {
                    pat: Box::new(inner),
                    key,
                    value,
                    bucket,
                    kind,
                    label,
                },
                start,
            ))
        })
    }

    /// One atomic item: scalar, variable, container, spread, or group.
    pub(crate) fn parse_item(&mut self) -> PResult<PatNode> {
        self.enter_recursion()?;
        let result = self.parse_item_inner();
        self.exit_recursion();
        result
    }

    fn parse_item_inner(&mut self) -> PResult<PatNode> {
        let start = self.start();
        match self.current() {
            TokenKind::Underscore => {
                self.bump();
                Ok(self.node(Pat::Any, start))
            }
            TokenKind::KwAnyString => {
                self.bump();
                Ok(self.node(Pat::TypedAny(PrimKind::String), start))
            }
            TokenKind::KwAnyNumber => {
                self.bump();
                Ok(self.node(Pat::TypedAny(PrimKind::Number), start))
            }
            TokenKind::KwAnyBoolean => {
                self.bump();
                Ok(self.node(Pat::TypedAny(PrimKind::Boolean), start))
            }
            TokenKind::KwTrue => {
                self.bump();
                Ok(self.node(Pat::Bool(true), start))
            }
            TokenKind::KwFalse => {
                self.bump();
                Ok(self.node(Pat::Bool(false), start))
            }
            TokenKind::KwNull => {
                self.bump();
                Ok(self.node(Pat::Null, start))
            }
            TokenKind::Number => {
                let value = self.parse_number_text()?;
                Ok(self.node(Pat::Num(value), start))
            }
            TokenKind::String => {
                let token = self.bump();
                let (content, ci) = unescape_string(self.text_of(token));
                let pat = if ci { Pat::StrCi(content) } else { Pat::Str(content) };
                Ok(self.node(pat, start))
            }
            TokenKind::Regex => {
                let pat = self.parse_regex_literal()?;
                Ok(self.node(pat, start))
            }
            TokenKind::Var => {
                let name = self.current_text()[1..].to_owned();
                self.bump();
                let span = self.span_from(start);
                Ok(PatNode::new(
                    Pat::Bind {
                        name,
                        pat: Box::new(PatNode::new(Pat::Any, span)),
                        guard: None,
                    },
                    span,
                ))
            }
            TokenKind::Ident => {
                let text = self.current_text().to_owned();
                self.bump();
                Ok(self.node(Pat::Str(text), start))
            }
            TokenKind::Ellipsis => {
                self.bump();
                let count = if self.at(TokenKind::LBrace) && self.at_count_brace() {
                    Some(self.parse_count_braces()?)
                } else {
                    None
                };
                Ok(self.node(Pat::Spread { count }, start))
            }
            TokenKind::SectName => {
                let label = self.current_text()['\u{00A7}'.len_utf8()..].to_owned();
                self.bump();
                match self.current() {
                    TokenKind::LBrace => self.parse_object(Some(label), false),
                    TokenKind::LBracket => self.parse_array(Some(label)),
                    _ => self.fail("`{` or `[` after a label"),
                }
            }
            TokenKind::LBrace => self.parse_object(None, false),
            TokenKind::LBracket => self.parse_array(None),
            TokenKind::LParen => self.parse_paren(),
            _ => self.fail("a pattern"),
        }
    }

    /// Can the current token start an item?
    pub(crate) fn at_item_start(&self) -> bool {
        matches!(
            self.current(),
            TokenKind::Underscore
                | TokenKind::KwAnyString
                | TokenKind::KwAnyNumber
                | TokenKind::KwAnyBoolean
                | TokenKind::KwTrue
                | TokenKind::KwFalse
                | TokenKind::KwNull
                | TokenKind::Number
                | TokenKind::String
                | TokenKind::Regex
                | TokenKind::Var
                | TokenKind::Ident
                | TokenKind::Ellipsis
                | TokenKind::SectName
                | TokenKind::LBrace
                | TokenKind::LBracket
                | TokenKind::LParen
        )
    }

    /// `( ... )`: lookaheads, runs, alternations, and `as`/`where` suffixes.
    fn parse_paren(&mut self) -> PResult<PatNode> {
        let start = self.start();
        self.bump(); // `(`

        // `(= P)` / `(! P)` lookahead
        if self.at(TokenKind::Eq) || self.at(TokenKind::Bang) {
            let negated = self.at(TokenKind::Bang);
            self.bump();
            self.commit();
            let inner = self.parse_run_alt()?;
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(self.node(
                Pat::Look {
                    negated,
                    pat: Box::new(inner),
                },
                start,
            ));
        }

        let inner = self.parse_run_alt()?;
        let mut node = inner;

        if self.eat(TokenKind::KwAs) {
            self.commit();
            match self.current() {
                TokenKind::Var => {
                    let name = self.current_text()[1..].to_owned();
                    self.bump();
                    node = self.node(
                        Pat::Bind {
                            name,
                            pat: Box::new(node),
                            guard: None,
                        },
                        start,
                    );
                }
                TokenKind::AtName => {
                    let name = self.current_text()[1..].to_owned();
                    self.bump();
                    node = self.node(
                        Pat::GroupBind {
                            name,
                            kind: SliceKind::Array,
                            pat: Box::new(node),
                        },
                        start,
                    );
                }
                TokenKind::PercentName => {
                    let name = self.current_text()[1..].to_owned();
                    self.bump();
                    node = self.node(
                        Pat::GroupBind {
                            name,
                            kind: SliceKind::Object,
                            pat: Box::new(node),
                        },
                        start,
                    );
                }
                _ => return self.fail("a binding name after `as`"),
            }
        }

        if self.eat(TokenKind::KwWhere) {
            self.commit();
            let guard = self.parse_expr()?;
            node = attach_guard(node, guard, self.span_from(start));
        }

        self.expect(TokenKind::RParen, "`)`")?;
        let span = self.span_from(start);
        Ok(PatNode::new(node.pat, span))
    }

    /// Alternation whose alternatives may be runs: `(a b | c)`.
    pub(crate) fn parse_run_alt(&mut self) -> PResult<PatNode> {
        let start = self.start();
        let first = self.parse_run()?;
        let mut alts = vec![first];
        let mut prioritized: Option<bool> = None;

        loop {
            let by_priority = match self.current() {
                TokenKind::Pipe => false,
                TokenKind::KwElse => true,
                _ => break,
            };
            let sep_span = self.current_span();
            match prioritized {
                None => prioritized = Some(by_priority),
                Some(p) if p != by_priority => {
                    return self.fail_fatal(
                        "cannot mix `|` and `else` at one level; parenthesize",
                        sep_span,
                    );
                }
                Some(_) => {}
            }
            self.bump();
            alts.push(self.parse_run()?);
        }

        if alts.len() == 1 {
            return Ok(alts.pop().expect("one alternative"));
        }
        Ok(self.node(
            Pat::Alt {
                alts,
                prioritized: prioritized.unwrap_or(false),
            },
            start,
        ))
    }

    /// A run of one or more quantified elements; more than one becomes a
    /// sequence group.
    fn parse_run(&mut self) -> PResult<PatNode> {
        let start = self.start();
        let mut items = vec![self.parse_quantified()?];
        loop {
            self.skip_commas();
            if !self.at_item_start() {
                break;
            }
            items.push(self.parse_quantified()?);
        }
        if items.len() == 1 {
            return Ok(items.pop().expect("one item"));
        }
        Ok(self.node(Pat::Group(items), start))
    }

    // --- Literal helpers ---

    pub(crate) fn parse_number_text(&mut self) -> PResult<f64> {
        let text = self.current_text();
        match text.parse::<f64>() {
            Ok(value) => {
                self.bump();
                Ok(value)
            }
            Err(_) => self.fail("a number"),
        }
    }

    fn parse_regex_literal(&mut self) -> PResult<Pat> {
        let text = self.current_text().to_owned();
        let span = self.current_span();
        self.bump();

        let close = text.rfind('/').expect("regex token has a closing slash");
        let body = text[1..close].replace(r"\/", "/");
        let flags = text[close + 1..].to_owned();

        for flag in flags.chars() {
            if flag == 'g' || flag == 'y' {
                return self.fail_fatal(format!("regex flag `{flag}` is not supported"), span);
            }
            if !regex_cache::SUPPORTED_FLAGS.contains(flag) {
                return self.fail_fatal(format!("unknown regex flag `{flag}`"), span);
            }
        }

        if let Err(e) = regex_cache::compile(&body, &flags) {
            return self.fail_fatal(format!("invalid regex: {e}"), span);
        }

        Ok(Pat::Regex(RegexPat {
            source: body,
            flags,
        }))
    }

    // --- Span helpers ---

    pub(crate) fn start(&self) -> TextSize {
        self.current_span().start()
    }

    pub(crate) fn span_from(&self, start: TextSize) -> TextRange {
        let end = self.prev_end().max(start);
        TextRange::new(start, end)
    }

    pub(crate) fn node(&self, pat: Pat, start: TextSize) -> PatNode {
        PatNode::new(pat, self.span_from(start))
    }

    pub(crate) fn text_of(&self, token: crate::parser::lexer::Token) -> &str {
        crate::parser::lexer::token_text(self.source, &token)
    }
}

/// Attaches a `where` guard: folded into a fresh binding, wrapped otherwise.
fn attach_guard(node: PatNode, guard: Expr, span: TextRange) -> PatNode {
    match node.pat {
        Pat::Bind {
            name,
            pat,
            guard: None,
        } => PatNode::new(
            Pat::Bind {
                name,
                pat,
                guard: Some(guard),
            },
            span,
        ),
        pat => PatNode::new(
            Pat::Guarded {
                pat: Box::new(PatNode::new(pat, span)),
                guard,
            },
            span,
        ),
    }
}

/// Strips quotes and the optional `/i` suffix, resolving escapes.
fn unescape_string(raw: &str) -> (String, bool) {
    let (body, ci) = match raw.strip_suffix("/i") {
        Some(rest) => (rest, true),
        None => (raw, false),
    };
    let body = &body[1..body.len() - 1];

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => out.push('\u{FFFD}'),
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    (out, ci)
}
