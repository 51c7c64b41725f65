use serde_json::json;

use tendril_core::Value;

use crate::engine::MatchError;
use crate::query::{Pattern, Solution};

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn solutions(pattern: &str, data: serde_json::Value) -> Vec<Solution> {
    Pattern::compile(pattern)
        .expect("pattern compiles")
        .on(&v(data))
        .solutions()
        .expect("search converges")
}

fn binding(solution: &Solution, name: &str) -> Value {
    solution.get(name).expect("binding present").clone()
}

#[test]
fn repeated_element_binding() {
    let sols = solutions("[$x $x ...]", json!([1, 1, 2, 3]));
    assert_eq!(sols.len(), 1);
    assert!(binding(&sols[0], "x").deep_eq(&v(json!(1))));

    assert!(solutions("[$x $x ...]", json!([1, 2, 3])).is_empty());
}

#[test]
fn object_binding_consistency() {
    let sols = solutions("{ a: $x, b: $x }", json!({"a": 7, "b": 7}));
    assert_eq!(sols.len(), 1);
    assert!(binding(&sols[0], "x").deep_eq(&v(json!(7))));

    assert!(solutions("{ a: $x, b: $x }", json!({"a": 7, "b": 8})).is_empty());
}

#[test]
fn deep_descent_finds_nested_key() {
    let data = json!({"a": {"b": {"password": "s3cr"}}});
    let sols = solutions("{ (_.)*password: $v }", data.clone());
    assert_eq!(sols.len(), 1);
    assert!(binding(&sols[0], "v").deep_eq(&v(json!("s3cr"))));

    // The modern spelling is the same pattern.
    let sols = solutions("{ **password: $v }", data);
    assert_eq!(sols.len(), 1);
}

#[test]
fn deep_descent_crosses_sequences() {
    let sols = solutions("{ **id: $v, %? }", json!({"list": [{"id": 7}]}));
    assert_eq!(sols.len(), 1);
    assert!(binding(&sols[0], "v").deep_eq(&v(json!(7))));
}

#[test]
fn strong_clause_flows_into_labelled_bucket() {
    let pattern = "\u{00A7}L { each _: /^ok$/ ->%hits<^L> }";

    let sols = solutions(pattern, json!({"a": "ok", "b": "ok"}));
    assert_eq!(sols.len(), 1);
    assert!(binding(&sols[0], "hits").deep_eq(&v(json!({"a": "ok", "b": "ok"}))));

    assert!(solutions(pattern, json!({"a": "ok", "b": "no"})).is_empty());
}

#[test]
fn key_flow_collects_in_insertion_order() {
    let pattern = "{ $k: 1 ->@ones, (! %) }";

    let sols = solutions(pattern, json!({"a": 1, "b": 1}));
    assert_eq!(sols.len(), 1);
    assert!(binding(&sols[0], "ones").deep_eq(&v(json!([1, 1]))));
    // The key binding is iteration-scoped: two keys matched, none exported.
    assert!(sols[0].get("k").is_none());

    assert!(solutions(pattern, json!({"a": 1, "b": 2})).is_empty());
}

#[test]
fn single_matched_key_exports_its_bindings() {
    let sols = solutions("{ $k: 1, %? }", json!({"a": 1, "b": 2}));
    assert_eq!(sols.len(), 1);
    assert!(binding(&sols[0], "k").deep_eq(&v(json!("a"))));
}

#[test]
fn objects_are_anchored_by_default() {
    assert!(solutions("{ a: 1 }", json!({"a": 1, "b": 2})).is_empty());
    assert_eq!(solutions("{ a: 1, %? }", json!({"a": 1, "b": 2})).len(), 1);
    assert_eq!(solutions("{ a: 1 }", json!({"a": 1})).len(), 1);
}

#[test]
fn remnant_counting() {
    assert!(solutions("{ a: 1, % }", json!({"a": 1})).is_empty());
    assert_eq!(solutions("{ a: 1, % }", json!({"a": 1, "b": 2})).len(), 1);
    assert_eq!(
        solutions("{ a: 1, %#{1,1} }", json!({"a": 1, "b": 2})).len(),
        1
    );
    assert!(solutions("{ a: 1, %#{2,} }", json!({"a": 1, "b": 2})).is_empty());
}

#[test]
fn named_remnant_binds_residue() {
    let sols = solutions("{ a: 1, (% as %rest) }", json!({"a": 1, "b": 2, "c": 3}));
    assert_eq!(sols.len(), 1);
    assert!(binding(&sols[0], "rest").deep_eq(&v(json!({"b": 2, "c": 3}))));
}

#[test]
fn optional_terms() {
    assert_eq!(solutions("{ a?: 1 }", json!({})).len(), 1);
    assert_eq!(solutions("{ a?: 1 }", json!({"a": 1})).len(), 1);
    // Key present with the wrong value: the term passes, anchoring fails.
    assert!(solutions("{ a?: 1 }", json!({"a": 2})).is_empty());
    assert_eq!(solutions("{ a?: 1, %? }", json!({"a": 2})).len(), 1);
}

#[test]
fn term_count_quantifiers() {
    let data = json!({"a": 1, "b": 1, "c": 2});
    assert_eq!(solutions("{ _#{2}: 1, %? }", data.clone()).len(), 1);
    assert!(solutions("{ _#{3,}: 1, %? }", data).is_empty());
}

#[test]
fn breadcrumbs_descend_by_key_and_index() {
    let sols = solutions("{ a.b: $v, %? }", json!({"a": {"b": 3}}));
    assert_eq!(sols.len(), 1);
    assert!(binding(&sols[0], "v").deep_eq(&v(json!(3))));

    let sols = solutions("{ a[1]: $v, %? }", json!({"a": [10, 20]}));
    assert_eq!(sols.len(), 1);
    assert!(binding(&sols[0], "v").deep_eq(&v(json!(20))));
}

#[test]
fn typed_wildcards() {
    assert_eq!(solutions("_string", json!("x")).len(), 1);
    assert!(solutions("_string", json!(1)).is_empty());
    assert_eq!(solutions("_number", json!(1)).len(), 1);
    assert_eq!(solutions("_boolean", json!(false)).len(), 1);
    assert!(solutions("_boolean", json!(null)).is_empty());
}

#[test]
fn string_predicates() {
    assert_eq!(solutions(r#""ok"/i"#, json!("OK")).len(), 1);
    assert!(solutions(r#""ok""#, json!("OK")).is_empty());
    // Regexes are substring predicates; anchors opt into full match.
    assert_eq!(solutions("/ok/", json!("look")).len(), 1);
    assert!(solutions("/^ok$/", json!("look")).is_empty());
    // Non-strings never match a string pattern.
    assert!(solutions("/1/", json!(1)).is_empty());
}

#[test]
fn sequence_lookaheads() {
    assert_eq!(solutions("[(! 2) _ _]", json!([1, 2])).len(), 1);
    assert!(solutions("[(! 2) _ _]", json!([2, 1])).is_empty());

    let sols = solutions("[(= (1 _)) $x _]", json!([1, 5]));
    assert_eq!(sols.len(), 1);
    assert!(binding(&sols[0], "x").deep_eq(&v(json!(1))));
}

#[test]
fn object_lookaheads() {
    let pattern = r#"{ (= a: 1), b: 2, %? }"#;
    assert_eq!(solutions(pattern, json!({"a": 1, "b": 2})).len(), 1);
    assert!(solutions(pattern, json!({"a": 9, "b": 2})).is_empty());

    let pattern = r#"{ (! secret: _), %? }"#;
    assert_eq!(solutions(pattern, json!({"a": 1})).len(), 1);
    assert!(solutions(pattern, json!({"secret": 1})).is_empty());
}

#[test]
fn prioritized_alternation_commits() {
    assert_eq!(solutions("(1 | _)", json!(1)).len(), 2);
    assert_eq!(solutions("(1 else _)", json!(1)).len(), 1);
    assert_eq!(solutions("(2 else _)", json!(1)).len(), 1);
}

#[test]
fn guards_prune_branches() {
    assert_eq!(solutions("($x where $x > 2)", json!(3)).len(), 1);
    assert!(solutions("($x where $x > 2)", json!(1)).is_empty());

    // Type errors fail the branch, not the search.
    assert!(solutions("($x where $x + 1 > 0)", json!("str")).is_empty());
}

#[test]
fn guards_defer_until_all_variables_bind() {
    let pattern = "[($x where $x == $y) $y]";
    assert_eq!(solutions(pattern, json!([2, 2])).len(), 1);
    assert!(solutions(pattern, json!([2, 3])).is_empty());

    // A guard whose variables never bind fails at emission.
    assert!(solutions("($x where $x == $y)", json!(2)).is_empty());
}

#[test]
fn failed_branches_leave_no_bucket_residue() {
    let sols = solutions("\u{00A7}L [ (_ ->@b<^L>)* 2 ]", json!([1, 2]));
    assert_eq!(sols.len(), 1);
    // The greedy three-element attempt failed; its flows died with it.
    assert!(binding(&sols[0], "b").deep_eq(&v(json!([1]))));
}

#[test]
fn collectors_gather_pairs_across_iterations() {
    let pattern =
        "\u{00A7}L { each (_ as $k): ($v) <collecting $k:$v in %pairs across ^L> }";
    let sols = solutions(pattern, json!({"a": 1, "b": 2}));
    assert_eq!(sols.len(), 1);
    assert!(binding(&sols[0], "pairs").deep_eq(&v(json!({"a": 1, "b": 2}))));
    // Per-iteration bindings are rolled back.
    assert!(sols[0].get("k").is_none());
    assert!(sols[0].get("v").is_none());
}

#[test]
fn cross_container_binding_consistency() {
    let pattern = "[{ n: $x, %? } { m: $x, %? }]";
    assert_eq!(
        solutions(pattern, json!([{"n": 5}, {"m": 5}])).len(),
        1
    );
    assert!(solutions(pattern, json!([{"n": 5}, {"m": 6}])).is_empty());
}

#[test]
fn whole_match_binding_is_recorded() {
    let sols = solutions("{ a: 1 }", json!({"a": 1}));
    assert!(binding(&sols[0], "$0").deep_eq(&v(json!({"a": 1}))));
}

#[test]
fn step_budget_aborts_ambiguous_searches() {
    let pattern = Pattern::builder("[_* _* _*]")
        .exec_fuel(20)
        .compile()
        .expect("pattern compiles");
    let data = v(json!([1, 2, 3, 4, 5, 6, 7, 8]));
    let result = pattern.on(&data).solutions();
    assert!(matches!(result, Err(MatchError::FuelExhausted(20))));
}

#[test]
fn identical_runs_are_deterministic() {
    let pattern = "[_* (_* as @g) ...]";
    let data = json!([1, 2, 3]);
    let first = solutions(pattern, data.clone());
    let second = solutions(pattern, data);
    assert_eq!(format!("{first:?}"), format!("{second:?}"));
}
