//! Object patterns: term clauses, breadcrumbs, groups, lookaheads, and
//! remnant rules.

use text_size::TextRange;

use crate::parser::Parser;
use crate::parser::ast::{Clause, Crumb, ObjPat, Pat, PatNode, Remnant, Term, TermNode};
use crate::parser::core::PResult;
use crate::parser::lexer::TokenKind;

impl Parser<'_> {
    /// `{ term* remnant? }`. In slice-find mode (`%{...}`) an unwritten
    /// remnant defaults to open instead of anchored.
    pub(crate) fn parse_object(
        &mut self,
        label: Option<String>,
        slice_mode: bool,
    ) -> PResult<PatNode> {
        self.with_context("an object pattern", |p| {
            let start = p.start();
            p.bump(); // `{`
            p.commit();

            let mut terms = Vec::new();
            let mut remnant: Option<(Remnant, TextRange)> = None;

            loop {
                p.skip_commas();
                if p.at(TokenKind::RBrace) {
                    break;
                }

                let term_start = p.current_span();

                if p.at(TokenKind::Percent) {
                    let r = p.parse_bare_remnant()?;
                    set_remnant(p, &mut remnant, r, term_start)?;
                    continue;
                }

                if p.at(TokenKind::LParen) {
                    if let Some(r) = p.attempt(|p| p.parse_paren_remnant())? {
                        set_remnant(p, &mut remnant, r, term_start)?;
                        continue;
                    }
                    if let Some(clause) = p.attempt(|p| p.parse_clause_term())? {
                        terms.push(clause);
                        continue;
                    }
                    terms.push(p.parse_term_group()?);
                    continue;
                }

                if !p.at_term_start() {
                    return p.fail("an object term or `}`");
                }
                terms.push(p.parse_clause_term()?);
            }

            p.expect(TokenKind::RBrace, "`}`")?;

            let remnant = match remnant {
                Some((r, _)) => r,
                None if slice_mode => Remnant::Any,
                None => Remnant::Closed,
            };

            Ok(p.node(
                Pat::Obj(ObjPat {
                    label,
                    terms,
                    remnant,
                }),
                start,
            ))
        })
    }

    fn at_term_start(&self) -> bool {
        self.at(TokenKind::KwEach)
            || self.at(TokenKind::Colon)
            || self.at(TokenKind::StarStar)
            || self.at_key_atom_start()
    }

    fn at_key_atom_start(&self) -> bool {
        matches!(
            self.current(),
            TokenKind::Ident
                | TokenKind::String
                | TokenKind::Regex
                | TokenKind::Var
                | TokenKind::Underscore
                | TokenKind::Number
                | TokenKind::LParen
        )
    }

    /// `%`, `%?`, `%#{m,n}`. The current token is `%`.
    fn parse_bare_remnant(&mut self) -> PResult<Remnant> {
        self.bump(); // `%`
        if self.eat(TokenKind::Question) {
            return Ok(Remnant::Any);
        }
        if self.at(TokenKind::Hash) {
            self.bump();
            if !self.at(TokenKind::LBrace) {
                return self.fail("`{` after `#`");
            }
            let count = self.parse_count_braces()?;
            return Ok(Remnant::Count(count));
        }
        Ok(Remnant::NonEmpty)
    }

    /// `(! %)`, `(= %)`, `(% as %name)`.
    fn parse_paren_remnant(&mut self) -> PResult<Remnant> {
        self.bump(); // `(`
        let remnant = match self.current() {
            TokenKind::Bang if self.nth(1) == TokenKind::Percent => {
                self.bump();
                self.bump();
                Remnant::AssertEmpty
            }
            TokenKind::Eq if self.nth(1) == TokenKind::Percent => {
                self.bump();
                self.bump();
                Remnant::NonEmpty
            }
            TokenKind::Percent if self.nth(1) == TokenKind::KwAs => {
                self.bump();
                self.bump();
                let token = self.expect(TokenKind::PercentName, "`%name`")?;
                let name = self.text_of(token)[1..].to_owned();
                Remnant::Named(name)
            }
            _ => return self.fail("a remnant rule"),
        };
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(remnant)
    }

    /// `(term*)`, `(term* as %name)`, `(= term*)`, `(! term*)`.
    fn parse_term_group(&mut self) -> PResult<TermNode> {
        let start = self.start();
        self.bump(); // `(`

        if self.at(TokenKind::Eq) || self.at(TokenKind::Bang) {
            let negated = self.at(TokenKind::Bang);
            self.bump();
            self.commit();
            let terms = self.parse_term_list()?;
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(TermNode {
                term: Term::Look { negated, terms },
                span: self.span_from(start),
            });
        }

        let terms = self.parse_term_list()?;

        if self.eat(TokenKind::KwAs) {
            self.commit();
            let token = self.expect(TokenKind::PercentName, "`%name`")?;
            let name = self.text_of(token)[1..].to_owned();
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(TermNode {
                term: Term::GroupBind { name, terms },
                span: self.span_from(start),
            });
        }

        self.expect(TokenKind::RParen, "`)`")?;
        Ok(TermNode {
            term: Term::Group(terms),
            span: self.span_from(start),
        })
    }

    fn parse_term_list(&mut self) -> PResult<Vec<TermNode>> {
        let mut terms = Vec::new();
        loop {
            self.skip_commas();
            if self.at(TokenKind::RParen) || self.at(TokenKind::KwAs) {
                break;
            }
            if self.at(TokenKind::LParen) {
                if let Some(clause) = self.attempt(|p| p.parse_clause_term())? {
                    terms.push(clause);
                    continue;
                }
                terms.push(self.parse_term_group()?);
                continue;
            }
            if !self.at_term_start() {
                if terms.is_empty() {
                    return self.fail("an object term");
                }
                break;
            }
            terms.push(self.parse_clause_term()?);
        }
        Ok(terms)
    }

    /// `each? keyPat crumbs* #{m,n}? ?? : valuePat`.
    fn parse_clause_term(&mut self) -> PResult<TermNode> {
        let start = self.start();
        let strong = self.eat(TokenKind::KwEach);

        let (key, crumbs) = self.parse_term_key()?;

        let count = if self.at(TokenKind::Hash) {
            self.bump();
            if !self.at(TokenKind::LBrace) {
                return self.fail("`{` after `#`");
            }
            Some(self.parse_count_braces()?)
        } else {
            None
        };
        let optional = self.eat(TokenKind::Question);

        self.expect(TokenKind::Colon, "`:`")?;
        self.commit();
        let value = self.parse_alt()?;

        Ok(TermNode {
            term: Term::Clause(Clause {
                strong,
                key,
                crumbs,
                value,
                count,
                optional,
            }),
            span: self.span_from(start),
        })
    }

    /// The key side of a clause: plain key plus breadcrumbs, a
    /// deep-descent head, or a bare `:` (any key).
    fn parse_term_key(&mut self) -> PResult<(PatNode, Vec<Crumb>)> {
        let start = self.start();

        // `: V` - value-only term.
        if self.at(TokenKind::Colon) {
            let span = TextRange::empty(start);
            return Ok((PatNode::new(Pat::Any, span), Vec::new()));
        }

        // `**key : V` - descend to every matching key.
        if self.at(TokenKind::StarStar) {
            self.bump();
            let key = self.parse_key_atom()?;
            let head = PatNode::new(Pat::RootKey, self.span_from(start));
            return Ok((head, vec![Crumb::Skip(key)]));
        }

        // `(_.)*key : V` - legacy spelling of the same descent.
        if let Some(key) = self.attempt(|p| p.parse_legacy_descent())? {
            let head = PatNode::new(Pat::RootKey, self.span_from(start));
            return Ok((head, vec![Crumb::Skip(key)]));
        }

        let head = self.parse_key_atom()?;
        let mut crumbs = Vec::new();
        loop {
            if self.eat(TokenKind::Dot) {
                crumbs.push(Crumb::Dot(self.parse_key_atom()?));
            } else if self.at(TokenKind::LBracket) {
                self.bump();
                let token = self.expect(TokenKind::Number, "a sequence index")?;
                let index = match self.text_of(token).parse::<usize>() {
                    Ok(i) => i,
                    Err(_) => return self.fail("a non-negative sequence index"),
                };
                self.expect(TokenKind::RBracket, "`]`")?;
                crumbs.push(Crumb::Index(index));
            } else if self.at(TokenKind::StarStar) {
                self.bump();
                crumbs.push(Crumb::Skip(self.parse_key_atom()?));
            } else {
                break;
            }
        }
        Ok((head, crumbs))
    }

    /// `(_.)*` followed by a key atom.
    fn parse_legacy_descent(&mut self) -> PResult<PatNode> {
        self.expect(TokenKind::LParen, "`(`")?;
        self.expect(TokenKind::Underscore, "`_`")?;
        self.expect(TokenKind::Dot, "`.`")?;
        self.expect(TokenKind::RParen, "`)`")?;
        self.expect(TokenKind::Star, "`*`")?;
        self.parse_key_atom()
    }

    /// One key pattern: bareword, string, regex, variable, wildcard,
    /// numeric key, or a parenthesized key alternation with `as`/`where`.
    fn parse_key_atom(&mut self) -> PResult<PatNode> {
        let start = self.start();
        match self.current() {
            TokenKind::Ident => {
                let text = self.current_text().to_owned();
                self.bump();
                Ok(self.node(Pat::Str(text), start))
            }
            TokenKind::Number => {
                // Mapping keys are strings; a bare numeric key matches its spelling.
                let text = self.current_text().to_owned();
                self.bump();
                Ok(self.node(Pat::Str(text), start))
            }
            TokenKind::String | TokenKind::Regex | TokenKind::Underscore | TokenKind::Var => {
                self.parse_item()
            }
            TokenKind::LParen => self.parse_key_paren(),
            _ => self.fail("a key pattern"),
        }
    }

    /// `( keyAtom (| keyAtom)* (as $x)? (where e)? )`.
    fn parse_key_paren(&mut self) -> PResult<PatNode> {
        let start = self.start();
        self.bump(); // `(`

        let first = self.parse_key_atom()?;
        let mut alts = vec![first];
        while self.eat(TokenKind::Pipe) {
            alts.push(self.parse_key_atom()?);
        }
        let mut node = if alts.len() == 1 {
            alts.pop().expect("one alternative")
        } else {
            self.node(
                Pat::Alt {
                    alts,
                    prioritized: false,
                },
                start,
            )
        };

        if self.eat(TokenKind::KwAs) {
            let token = self.expect(TokenKind::Var, "`$name`")?;
            let name = self.text_of(token)[1..].to_owned();
            node = self.node(
                Pat::Bind {
                    name,
                    pat: Box::new(node),
                    guard: None,
                },
                start,
            );
        }

        if self.eat(TokenKind::KwWhere) {
            let guard = self.parse_expr()?;
            node = match node.pat {
                Pat::Bind {
                    name,
                    pat,
                    guard: None,
                } => self.node(
                    Pat::Bind {
                        name,
                        pat,
                        guard: Some(guard),
                    },
                    start,
                ),
                pat => {
                    let span = self.span_from(start);
                    self.node(
                        Pat::Guarded {
                            pat: Box::new(PatNode::new(pat, span)),
                            guard,
                        },
                        start,
                    )
                }
            };
        }

        self.expect(TokenKind::RParen, "`)`")?;
        Ok(node)
    }
}

fn set_remnant(
    p: &mut Parser<'_>,
    slot: &mut Option<(Remnant, TextRange)>,
    remnant: Remnant,
    span: TextRange,
) -> PResult<()> {
    if slot.is_some() {
        return p.fail_fatal("an object pattern takes at most one remnant rule", span);
    }
    *slot = Some((remnant, span));
    Ok(())
}
