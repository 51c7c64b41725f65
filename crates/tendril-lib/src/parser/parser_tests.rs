use indoc::indoc;

use crate::CompileError;

fn dump(source: &str) -> String {
    crate::parser::parse(source)
        .expect("pattern parses")
        .dump()
}

fn parse_err(source: &str) -> String {
    match crate::parser::parse(source) {
        Err(CompileError::Syntax { message, .. }) => message,
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn scalar_atoms() {
    insta::assert_snapshot!(dump("42"), @"42");
    insta::assert_snapshot!(dump("null"), @"null");
    insta::assert_snapshot!(dump("bare"), @r#""bare""#);
    insta::assert_snapshot!(dump(r#""quoted"/i"#), @r#""quoted"/i"#);
    insta::assert_snapshot!(dump("/^a+$/i"), @"/^a+$/i");
    insta::assert_snapshot!(dump("_number"), @"_number");
}

#[test]
fn variable_is_sugar_for_bound_wildcard() {
    insta::assert_snapshot!(dump("$x"), @"(bind $x _)");
}

#[test]
fn array_with_repeated_binding_and_spread() {
    insta::assert_snapshot!(
        dump("[$x $x \u{2026}]"),
        @"(arr (bind $x _) (bind $x _) (spread))"
    );
}

#[test]
fn array_quantifiers() {
    insta::assert_snapshot!(
        dump("[a+ b{2,} c??]"),
        @r#"(arr (quant greedy {1,} "a") (quant greedy {2,} "b") (quant lazy {0,1} "c"))"#
    );
    insta::assert_snapshot!(
        dump("[_*+ ...{1,3}]"),
        @"(arr (quant possessive {0,} _) (spread {1,3}))"
    );
}

#[test]
fn object_terms() {
    insta::assert_snapshot!(
        dump("{ a: $x, b: $x }"),
        @r#"(obj (term "a" : (bind $x _)) (term "b" : (bind $x _)) closed)"#
    );
}

#[test]
fn object_term_suffixes() {
    insta::assert_snapshot!(
        dump("{ a?: 1, b#{2}: 2 }"),
        @r#"(obj (term "a"? : 1) (term "b" #{2} : 2) closed)"#
    );
}

#[test]
fn breadcrumb_chain() {
    insta::assert_snapshot!(
        dump("{ a.b[0].c: 1 }"),
        @r#"(obj (term "a" ."b" [0] ."c" : 1) closed)"#
    );
}

#[test]
fn deep_descent_spellings_agree() {
    let modern = dump("{ **password: $v }");
    let legacy = dump("{ (_.)*password: $v }");
    assert_eq!(modern, legacy);
    insta::assert_snapshot!(
        modern,
        @r#"(obj (term ** **"password" : (bind $v _)) closed)"#
    );
}

#[test]
fn remnant_forms() {
    insta::assert_snapshot!(dump("{ % }"), @"(obj %)");
    insta::assert_snapshot!(dump("{ %? }"), @"(obj %?)");
    insta::assert_snapshot!(dump("{ %#{1,2} }"), @"(obj %#{1,2})");
    insta::assert_snapshot!(dump("{ (% as %rest) }"), @"(obj (% as %rest))");
    insta::assert_snapshot!(dump("{ (! %) }"), @"(obj (!%))");
    insta::assert_snapshot!(dump("{ (= %) }"), @"(obj %)");
}

#[test]
fn labelled_strong_clause_with_flow() {
    insta::assert_snapshot!(
        dump("\u{00A7}L { each _: /^ok$/ \u{2192}%hits<^L> }"),
        @"(obj \u{00A7}L (term each _ : (flow /^ok$/ ->%hits ^L)) closed)"
    );
}

#[test]
fn key_binding_with_flow_and_anchor() {
    insta::assert_snapshot!(
        dump("{ $k: 1 ->@ones, (! %) }"),
        @"(obj (term (bind $k _) : (flow 1 ->@ones)) (!%))"
    );
}

#[test]
fn collect_directive() {
    insta::assert_snapshot!(
        dump("\u{00A7}L { each (_ as $k): ($v) <collecting $k:$v in %pairs across ^L> }"),
        @"(obj \u{00A7}L (term each (bind $k _) : (collect (bind $v _) $k:$v in %pairs across ^L)) closed)"
    );
}

#[test]
fn group_binds_and_guards() {
    insta::assert_snapshot!(dump("(_ _ as @pair)"), @"(slice @pair (run _ _))");
    insta::assert_snapshot!(
        dump("($x where $x > 3)"),
        @"(bind $x _ where (> $x 3))"
    );
    insta::assert_snapshot!(
        dump("(_ where $a + 1 * 2 == 3 && !$b || $c)"),
        @"(guard _ where (|| (&& (== (+ $a (* 1 2)) 3) (! $b)) $c))"
    );
}

#[test]
fn lookaheads() {
    insta::assert_snapshot!(dump("[(= 1) 2]"), @"(arr (look 1) 2)");
    insta::assert_snapshot!(dump("[(! 1) 2]"), @"(arr (look! 1) 2)");
}

#[test]
fn alternation_flavors() {
    insta::assert_snapshot!(dump("1 | 2 | 3"), @"(alt 1 2 3)");
    insta::assert_snapshot!(dump("1 else 2"), @"(else 1 2)");
    insta::assert_snapshot!(dump("[(1 2 | 3) 9]"), @"(arr (alt (run 1 2) 3) 9)");
}

#[test]
fn slice_find_entries() {
    insta::assert_snapshot!(dump("@[1 2]"), @"(find-slice @ (arr 1 2))");
    insta::assert_snapshot!(
        dump("%{ a: 1 }"),
        @r#"(find-slice % (obj (term "a" : 1) %?))"#
    );
}

#[test]
fn newlines_and_commas_are_insignificant() {
    let multiline = indoc! {"
        {
            user: {
                name: $n,
            },
            %?
        }
    "};
    assert_eq!(
        dump(multiline),
        dump("{ user: { name: $n }, %? }")
    );
}

#[test]
fn mixing_alternation_kinds_is_rejected() {
    let message = parse_err("1 | 2 else 3");
    assert!(message.contains("cannot mix"), "got: {message}");
}

#[test]
fn unclosed_array_reports_farthest_failure() {
    let message = parse_err("[1");
    assert!(message.contains("expected"), "got: {message}");
    assert!(message.contains("sequence pattern"), "got: {message}");
}

#[test]
fn missing_term_value_reports_position() {
    let message = parse_err("{ a: }");
    assert!(message.contains("expected a pattern"), "got: {message}");
}

#[test]
fn unterminated_string_is_a_syntax_error() {
    assert!(crate::parser::parse(r#"["oops"#).is_err());
}

#[test]
fn forbidden_regex_flags_are_rejected() {
    let message = parse_err("/a/g");
    assert!(message.contains("flag"), "got: {message}");
}

#[test]
fn invalid_regex_is_a_syntax_error() {
    let message = parse_err("/[/");
    assert!(message.contains("regex"), "got: {message}");
}

#[test]
fn empty_count_range_is_rejected() {
    let message = parse_err("[_{3,1}]");
    assert!(message.contains("count range"), "got: {message}");
}

#[test]
fn trailing_garbage_is_rejected() {
    assert!(crate::parser::parse("[1] [2]").is_err());
}
