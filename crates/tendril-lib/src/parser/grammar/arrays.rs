//! Sequence patterns: element lists and quantifier suffixes.

use crate::parser::Parser;
use crate::parser::ast::{ArrPat, Counted, Pat, PatNode, QuantMode};
use crate::parser::core::PResult;
use crate::parser::lexer::TokenKind;

impl Parser<'_> {
    /// `[ element* ]`, anchored unless the tail is a spread.
    pub(crate) fn parse_array(&mut self, label: Option<String>) -> PResult<PatNode> {
        self.with_context("a sequence pattern", |p| {
            let start = p.start();
            p.bump(); // `[`
            p.commit();

            let mut items = Vec::new();
            loop {
                p.skip_commas();
                if p.at(TokenKind::RBracket) {
                    break;
                }
                if !p.at_item_start() {
                    return p.fail("an element or `]`");
                }
                items.push(p.parse_alt()?);
            }

            p.expect(TokenKind::RBracket, "`]`")?;
            Ok(p.node(Pat::Arr(ArrPat { label, items }), start))
        })
    }

    /// A trailing quantifier, if present: the nine operator spellings or a
    /// `{m,n}` count. Returns `None` without consuming otherwise.
    pub(crate) fn parse_quantifier(&mut self) -> PResult<Option<(Counted, QuantMode)>> {
        let one = Counted { min: 0, max: Some(1) };
        let (count, mode) = match self.current() {
            TokenKind::Question => (one, QuantMode::Greedy),
            TokenKind::QuestionQuestion => (one, QuantMode::Lazy),
            TokenKind::QuestionPlus => (one, QuantMode::Possessive),
            TokenKind::Star => (Counted::ZERO_OR_MORE, QuantMode::Greedy),
            TokenKind::StarQuestion => (Counted::ZERO_OR_MORE, QuantMode::Lazy),
            TokenKind::StarPlus => (Counted::ZERO_OR_MORE, QuantMode::Possessive),
            TokenKind::Plus => (Counted::ONE_OR_MORE, QuantMode::Greedy),
            TokenKind::PlusQuestion => (Counted::ONE_OR_MORE, QuantMode::Lazy),
            TokenKind::PlusPlus => (Counted::ONE_OR_MORE, QuantMode::Possessive),
            TokenKind::LBrace if self.at_count_brace() => {
                let count = self.parse_count_braces()?;
                return Ok(Some((count, QuantMode::Greedy)));
            }
            _ => return Ok(None),
        };
        self.bump();
        Ok(Some((count, mode)))
    }

    /// Distinguishes a `{m,n}` count from an object pattern: a count brace
    /// opens with a number or a comma.
    pub(crate) fn at_count_brace(&self) -> bool {
        self.at(TokenKind::LBrace)
            && matches!(self.nth(1), TokenKind::Number | TokenKind::Comma)
    }

    /// `{m}` / `{m,n}` / `{m,}` / `{,n}`. The current token is `{`.
    pub(crate) fn parse_count_braces(&mut self) -> PResult<Counted> {
        let open_span = self.current_span();
        self.bump(); // `{`

        let min = if self.at(TokenKind::Number) {
            Some(self.parse_count_number()?)
        } else {
            None
        };

        let count = if self.eat(TokenKind::Comma) {
            let max = if self.at(TokenKind::Number) {
                Some(self.parse_count_number()?)
            } else {
                None
            };
            Counted {
                min: min.unwrap_or(0),
                max,
            }
        } else {
            match min {
                Some(n) => Counted::exactly(n),
                None => return self.fail("a count"),
            }
        };

        self.expect(TokenKind::RBrace, "`}`")?;

        if let Some(max) = count.max
            && count.min > max
        {
            return self.fail_fatal(
                format!("count range is empty: {{{},{}}}", count.min, max),
                open_span,
            );
        }
        Ok(count)
    }

    fn parse_count_number(&mut self) -> PResult<u32> {
        let text = self.current_text();
        match text.parse::<u32>() {
            Ok(n) => {
                self.bump();
                Ok(n)
            }
            Err(_) => self.fail("a non-negative count"),
        }
    }
}
