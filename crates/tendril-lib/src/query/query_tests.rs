use serde_json::json;

use tendril_core::Value;

use crate::edit::{EditOptions, EditPlan};
use crate::engine::MatchError;
use crate::{CompileError, Pattern};

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

#[test]
fn anchored_test_and_solve() {
    let pattern = Pattern::compile("{ user: { name: $n }, %? }").unwrap();
    let data = v(json!({"user": {"name": "ada"}, "extra": 1}));

    assert!(pattern.on(&data).test().unwrap());
    let solution = pattern.on(&data).solve().unwrap().expect("a match");
    assert_eq!(solution.get("$n").and_then(Value::as_str), Some("ada"));

    let miss = v(json!({"user": {}}));
    assert!(!pattern.on(&miss).test().unwrap());
}

#[test]
fn find_visits_nodes_in_preorder() {
    let pattern = Pattern::compile("_number").unwrap();
    let data = v(json!({"a": [1, 2], "b": 3}));
    let found = pattern.find(&data).unwrap();

    let paths: Vec<String> = found.paths().iter().map(ToString::to_string).collect();
    assert_eq!(paths, ["$.a[0]", "$.a[1]", "$.b"]);

    let first = found.first().expect("an occurrence");
    assert!(first.value().deep_eq(&v(json!(1))));
}

#[test]
fn root_occurrence_precedes_descendants() {
    let pattern = Pattern::compile("[...]").unwrap();
    let data = v(json!([[1], [2]]));
    let found = pattern.find(&data).unwrap();
    let paths: Vec<String> = found.paths().iter().map(ToString::to_string).collect();
    assert_eq!(paths, ["$", "$[0]", "$[1]"]);
}

#[test]
fn exists_and_first_short_circuit() {
    let pattern = Pattern::compile("_number").unwrap();
    let data = v(json!({"a": [1, 2], "b": 3}));

    assert!(pattern.exists(&data).unwrap());
    assert!(!pattern.exists(&v(json!({"a": "x"}))).unwrap());

    let first = pattern.first(&data).unwrap().expect("an occurrence");
    assert_eq!(first.path().to_string(), "$.a[0]");
}

#[test]
fn unique_bindings_deduplicate_by_value() {
    let pattern = Pattern::compile("_number").unwrap();
    let data = v(json!([1, 2, 1]));
    let found = pattern.find(&data).unwrap();
    assert_eq!(found.count(), 3);
    assert_eq!(found.unique_bindings("0").len(), 2);
}

#[test]
fn take_and_filter() {
    let pattern = Pattern::compile("_number").unwrap();
    let data = v(json!([1, 2, 3]));

    let found = pattern.find(&data).unwrap();
    assert_eq!(found.take(2).count(), 2);

    let found = pattern.find(&data).unwrap();
    let filtered = found.filter(|o| o.value().as_num() == Some(2.0));
    assert_eq!(filtered.count(), 1);
}

#[test]
fn object_slice_find_exports_witness_bindings() {
    let pattern = Pattern::compile("%{ $k: _number }").unwrap();
    let data = v(json!({"a": 1, "b": "x"}));
    let found = pattern.find(&data).unwrap();
    assert_eq!(found.count(), 1);

    let solution = &found.first().unwrap().solutions()[0];
    assert_eq!(solution.get("k").and_then(Value::as_str), Some("a"));
    assert!(solution.get("0").unwrap().deep_eq(&v(json!({"a": 1}))));
}

#[test]
fn mutate_edits_in_place() {
    let pattern = Pattern::compile("{ a: $x, %? }").unwrap();
    let mut data = v(json!({"a": 1, "b": 2}));
    let report = pattern
        .mutate(&mut data, &EditPlan::new().set("x", 5), EditOptions::new())
        .unwrap();
    assert_eq!(report.applied, 1);
    assert!(data.deep_eq(&v(json!({"a": 5, "b": 2}))));
}

#[test]
fn fuel_limit_surfaces_through_the_facade() {
    let pattern = Pattern::builder("[_* _* _*]")
        .exec_fuel(10)
        .compile()
        .unwrap();
    let result = pattern.find(&v(json!([1, 2, 3, 4, 5, 6])));
    assert!(matches!(result, Err(MatchError::FuelExhausted(10))));
}

#[test]
fn fuel_accounting_is_reported() {
    let pattern = Pattern::compile("1").unwrap();
    let found = pattern.find(&v(json!([1]))).unwrap();
    assert!(found.fuel_spent() > 0);
}

#[test]
fn compile_errors_are_classified() {
    assert!(matches!(
        Pattern::compile("[1"),
        Err(CompileError::Syntax { .. })
    ));
    assert!(matches!(
        Pattern::compile("{ a: 1? }"),
        Err(CompileError::Validation { .. })
    ));

    let err = Pattern::compile("[1").unwrap_err();
    assert!(!err.diagnostics().is_empty());
}

#[test]
fn solutions_iterate_across_occurrences() {
    let pattern = Pattern::compile("_number").unwrap();
    let data = v(json!([1, 2]));
    let found = pattern.find(&data).unwrap();
    assert_eq!(found.solutions().count(), 2);
}
