use super::lexer::{TokenKind, lex, token_text};

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source)
        .into_iter()
        .map(|t| t.kind)
        .filter(|k| !k.is_trivia())
        .collect()
}

#[test]
fn atoms() {
    use TokenKind::*;
    assert_eq!(
        kinds("_ _string 42 -3.5 true null name"),
        [Underscore, KwAnyString, Number, Number, KwTrue, KwNull, Ident]
    );
}

#[test]
fn sigiled_names() {
    use TokenKind::*;
    assert_eq!(
        kinds("$x @rest %obj \u{00A7}L ^L"),
        [Var, AtName, PercentName, SectName, CaretName]
    );
}

#[test]
fn quantifier_operators() {
    use TokenKind::*;
    assert_eq!(
        kinds("? ?? ?+ * *? *+ + +? ++"),
        [
            Question,
            QuestionQuestion,
            QuestionPlus,
            Star,
            StarQuestion,
            StarPlus,
            Plus,
            PlusQuestion,
            PlusPlus
        ]
    );
}

#[test]
fn unicode_and_ascii_spellings() {
    use TokenKind::*;
    assert_eq!(
        kinds("\u{2026} -> \u{2192} ** ..."),
        [Ellipsis, Arrow, Arrow, StarStar, Ellipsis]
    );
}

#[test]
fn strings_and_ci_suffix() {
    let tokens = lex(r#""a b" "c"/i"#);
    let significant: Vec<_> = tokens.iter().filter(|t| !t.kind.is_trivia()).collect();
    assert_eq!(significant.len(), 2);
    assert_eq!(significant[0].kind, TokenKind::String);
    assert_eq!(token_text(r#""a b" "c"/i"#, significant[1]), r#""c"/i"#);
}

#[test]
fn regex_literal_and_line_comment() {
    assert_eq!(kinds("/ab/i // trailing words"), [TokenKind::Regex]);
    let tokens = lex("/ab/i");
    assert_eq!(token_text("/ab/i", &tokens[0]), "/ab/i");
}

#[test]
fn flow_arrow_and_label_reference() {
    use TokenKind::*;
    assert_eq!(
        kinds("1 ->%hits<^L>"),
        [Number, Arrow, PercentName, Lt, CaretName, Gt]
    );
}

#[test]
fn count_suffix_tokens() {
    use TokenKind::*;
    assert_eq!(
        kinds("a#{2,3}"),
        [Ident, Hash, LBrace, Number, Comma, Number, RBrace]
    );
}

#[test]
fn comparison_and_logic_operators() {
    use TokenKind::*;
    assert_eq!(
        kinds("== != <= >= && || ! = < >"),
        [EqEq, BangEq, Le, Ge, AndAnd, OrOr, Bang, Eq, Lt, Gt]
    );
}

#[test]
fn unrecognized_characters_coalesce() {
    use TokenKind::*;
    assert_eq!(kinds("a ~~~ b"), [Ident, Garbage, Ident]);
}
