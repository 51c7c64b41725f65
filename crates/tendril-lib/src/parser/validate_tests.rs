use crate::CompileError;

fn validation_err(source: &str) -> String {
    match crate::parser::compile(source) {
        Err(CompileError::Validation { message, .. }) => message,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

fn compiles(source: &str) {
    crate::parser::compile(source).expect("pattern compiles");
}

#[test]
fn quantifier_must_sit_in_a_sequence() {
    let message = validation_err("{ a: 1? }");
    assert!(message.contains("quantifier"), "got: {message}");
}

#[test]
fn spread_must_sit_in_a_sequence() {
    let message = validation_err("{ a: ... }");
    assert!(message.contains("..."), "got: {message}");
}

#[test]
fn lookahead_must_sit_in_a_sequence() {
    let message = validation_err("{ a: (= 1) }");
    assert!(message.contains("lookahead"), "got: {message}");
}

#[test]
fn flow_needs_an_enclosing_scope() {
    let message = validation_err("1 ->@b");
    assert!(message.contains("flow"), "got: {message}");
}

#[test]
fn flow_label_must_resolve() {
    let message = validation_err("{ a: 1 ->@b<^L> }");
    assert!(message.contains("^L"), "got: {message}");
}

#[test]
fn bucket_sigils_cannot_mix() {
    let message =
        validation_err("\u{00A7}L { a: 1 ->@b<^L>, c: 2 ->%b<^L> }");
    assert!(message.contains("used with both"), "got: {message}");
}

#[test]
fn bucket_cannot_flow_into_two_scopes() {
    let message = validation_err(
        "\u{00A7}L { a: \u{00A7}M { x: 1 ->@b<^M>, %? }, c: 2 ->@b<^L>, %? }",
    );
    assert!(message.contains("two different scopes"), "got: {message}");
}

#[test]
fn object_bucket_needs_a_keyed_scope() {
    let message = validation_err("\u{00A7}L [ 1 ->%b<^L> ]");
    assert!(message.contains("sequence"), "got: {message}");
}

#[test]
fn collect_pairs_need_an_object_bucket() {
    let message = validation_err(
        "\u{00A7}L { each $k: $v <collecting $k:$v in @pairs across ^L> }",
    );
    assert!(message.contains("object bucket"), "got: {message}");
}

#[test]
fn collect_values_need_an_array_bucket() {
    let message = validation_err(
        "\u{00A7}L { each _: ($v) <collecting $v in %vals across ^L> }",
    );
    assert!(message.contains("array bucket"), "got: {message}");
}

#[test]
fn one_name_gets_one_sigil() {
    let message = validation_err("[ $x (1 as @x) ]");
    assert!(message.contains("used with both"), "got: {message}");
}

#[test]
fn slice_binding_outside_a_sequence_is_rejected() {
    let message = validation_err("{ a: (1 as @s) }");
    assert!(message.contains("slice binding"), "got: {message}");
}

#[test]
fn labels_cannot_shadow() {
    let message = validation_err("\u{00A7}L { a: \u{00A7}L { b: 1, %? }, %? }");
    assert!(message.contains("already declared"), "got: {message}");
}

#[test]
fn count_and_optional_cannot_combine() {
    let message = validation_err("{ a#{2}?: 1 }");
    assert!(message.contains("not both"), "got: {message}");
}

#[test]
fn well_formed_patterns_pass() {
    compiles("[$x $x ...]");
    compiles("{ a: $x, b: $x }");
    compiles("\u{00A7}L { each _: /^ok$/ ->%hits<^L> }");
    compiles("{ $k: 1 ->@ones, (! %) }");
    compiles("{ **password: $v }");
    compiles("@[1 2]");
    compiles("%{ a: 1 }");
    compiles("\u{00A7}L { each (_ as $k): ($v) <collecting $k:$v in %pairs across ^L> }");
}
