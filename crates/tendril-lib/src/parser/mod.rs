//! The pattern compiler: tokenizer, backtracking recursive-descent
//! parser, and post-parse validator.

pub mod ast;
pub(crate) mod core;
mod dump;
mod grammar;
pub mod lexer;
pub mod validate;

#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod parser_tests;
#[cfg(test)]
mod validate_tests;

use crate::CompileError;
use self::ast::PatNode;
pub use self::core::Parser;

/// Parses a pattern source into its AST. Syntax errors only; validation
/// is a separate pass.
pub fn parse(source: &str) -> Result<PatNode, CompileError> {
    let tokens = lexer::lex(source);
    let mut parser = Parser::new(source, tokens);
    match parser.parse_pattern() {
        Ok(node) if parser.eof() => Ok(node),
        Ok(_) => {
            let _: self::core::PResult<()> = parser.fail("end of pattern");
            Err(parser.into_syntax_error())
        }
        Err(_) => Err(parser.into_syntax_error()),
    }
}

/// Parses and validates a pattern source.
pub fn compile(source: &str) -> Result<PatNode, CompileError> {
    let ast = parse(source)?;
    let diagnostics = validate::validate(&ast);
    if diagnostics.has_errors() {
        let message = diagnostics
            .first_message()
            .map(|m| m.message().to_owned())
            .unwrap_or_default();
        return Err(CompileError::Validation {
            message,
            diagnostics,
        });
    }
    Ok(ast)
}
