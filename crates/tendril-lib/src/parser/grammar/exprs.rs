//! Guard expressions: a precedence-climbing parser for the tiny
//! arithmetic/comparison/logic sub-language used after `where`.

use crate::parser::Parser;
use crate::parser::ast::{BinaryOp, CallFunc, Expr, UnaryOp};
use crate::parser::core::PResult;
use crate::parser::lexer::TokenKind;

/// Binding power per operator; higher binds tighter. All binary
/// operators are left-associative.
fn binary_op(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    Some(match kind {
        TokenKind::OrOr => (BinaryOp::Or, 1),
        TokenKind::AndAnd => (BinaryOp::And, 2),
        TokenKind::EqEq => (BinaryOp::Eq, 3),
        TokenKind::BangEq => (BinaryOp::Ne, 3),
        TokenKind::Lt => (BinaryOp::Lt, 4),
        TokenKind::Gt => (BinaryOp::Gt, 4),
        TokenKind::Le => (BinaryOp::Le, 4),
        TokenKind::Ge => (BinaryOp::Ge, 4),
        TokenKind::Plus => (BinaryOp::Add, 5),
        TokenKind::Minus => (BinaryOp::Sub, 5),
        TokenKind::Star => (BinaryOp::Mul, 6),
        TokenKind::Percent => (BinaryOp::Rem, 6),
        _ => return None,
    })
}

impl Parser<'_> {
    pub(crate) fn parse_expr(&mut self) -> PResult<Expr> {
        self.with_context("a guard expression", |p| p.parse_binary_expr(0))
    }

    fn parse_binary_expr(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary_expr()?;
        loop {
            let Some((op, bp)) = binary_op(self.current()) else {
                break;
            };
            if bp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.parse_binary_expr(bp + 1)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary_expr(&mut self) -> PResult<Expr> {
        let op = match self.current() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_primary_expr(),
        };
        self.bump();
        let expr = self.parse_unary_expr()?;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    fn parse_primary_expr(&mut self) -> PResult<Expr> {
        match self.current() {
            TokenKind::Number => {
                let value = self.parse_number_text()?;
                Ok(Expr::Num(value))
            }
            TokenKind::String => {
                let text = self.current_text();
                if text.ends_with("/i") {
                    let span = self.current_span();
                    return self.fail_fatal(
                        "case-insensitive strings are not guard values",
                        span,
                    );
                }
                let content = unescape_guard_string(text);
                self.bump();
                Ok(Expr::Str(content))
            }
            TokenKind::KwTrue => {
                self.bump();
                Ok(Expr::Bool(true))
            }
            TokenKind::KwFalse => {
                self.bump();
                Ok(Expr::Bool(false))
            }
            TokenKind::KwNull => {
                self.bump();
                Ok(Expr::Null)
            }
            TokenKind::Underscore => {
                self.bump();
                Ok(Expr::Anon)
            }
            TokenKind::Var => {
                let name = self.current_text()[1..].to_owned();
                self.bump();
                Ok(Expr::Var(name))
            }
            TokenKind::Ident => {
                let func = match self.current_text() {
                    "number" => CallFunc::Number,
                    "string" => CallFunc::String,
                    "boolean" => CallFunc::Boolean,
                    "size" => CallFunc::Size,
                    _ => return self.fail("`number`, `string`, `boolean` or `size`"),
                };
                self.bump();
                self.expect(TokenKind::LParen, "`(`")?;
                let arg = self.parse_binary_expr(0)?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(Expr::Call {
                    func,
                    arg: Box::new(arg),
                })
            }
            TokenKind::LParen => {
                self.bump();
                let expr = self.parse_binary_expr(0)?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(expr)
            }
            _ => self.fail("a guard expression"),
        }
    }
}

/// Guard strings reuse the pattern string syntax without the `/i` suffix.
fn unescape_guard_string(raw: &str) -> String {
    let body = &raw[1..raw.len() - 1];
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
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
