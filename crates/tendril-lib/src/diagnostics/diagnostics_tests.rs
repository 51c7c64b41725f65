use text_size::TextRange;

use super::Diagnostics;

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(start.into(), end.into())
}

#[test]
fn builder_collects_messages() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.error("boom", range(0, 2)).emit();
    diagnostics.warning("meh", range(3, 4)).emit();

    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.has_errors());
    assert_eq!(diagnostics.first_message().unwrap().message(), "boom");
}

#[test]
fn plain_rendering_without_source() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.error("boom", range(0, 2)).emit();
    assert_eq!(diagnostics.printer().render(), "error at 0..2: boom");
}

#[test]
fn related_info_appears_in_plain_output() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .error("duplicate name", range(10, 12))
        .related_to("first use here", range(0, 2))
        .emit();
    let rendered = diagnostics.printer().render();
    assert!(rendered.contains("duplicate name"));
    assert!(rendered.contains("first use here"));
}

#[test]
fn source_rendering_carries_the_message() {
    let source = "{ a: 1? }";
    let mut diagnostics = Diagnostics::new();
    diagnostics.error("quantifier outside a sequence", range(5, 7)).emit();
    let rendered = diagnostics.printer().source(source).render();
    assert!(rendered.contains("quantifier outside a sequence"));
    assert!(rendered.contains("error"));
}

#[test]
fn empty_diagnostics_render_nothing() {
    let diagnostics = Diagnostics::new();
    assert_eq!(diagnostics.printer().source("x").render(), "");
}
