use serde_json::json;

use tendril_core::Value;

use crate::EditError;
use crate::edit::{CasAction, EditOptions, EditPlan};
use crate::query::Pattern;

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

#[test]
fn identity_edit_is_a_noop() {
    let pattern = Pattern::compile("{ a: $x, %? }").unwrap();
    let data = v(json!({"a": 7, "b": 1}));
    let (out, report) = pattern
        .on(&data)
        .edit(&EditPlan::new().set("x", 7), EditOptions::new())
        .unwrap();
    assert!(out.deep_eq(&data));
    assert_eq!(report.applied, 1);
    assert!(report.cas_failures.is_empty());
    assert!(report.conflicts.is_empty());
}

#[test]
fn scalar_overwrite() {
    let pattern = Pattern::compile("{ a: $x, %? }").unwrap();
    let data = v(json!({"a": 7, "b": 1}));
    let (out, report) = pattern
        .on(&data)
        .edit(&EditPlan::new().set("$x", 42), EditOptions::new())
        .unwrap();
    assert!(out.deep_eq(&v(json!({"a": 42, "b": 1}))));
    assert_eq!(report.applied, 1);
}

#[test]
fn repeated_binding_edits_every_site() {
    let pattern = Pattern::compile("{ a: $x, b: $x }").unwrap();
    let data = v(json!({"a": 7, "b": 7}));
    let (out, report) = pattern
        .on(&data)
        .edit(&EditPlan::new().set("x", 0), EditOptions::new())
        .unwrap();
    assert!(out.deep_eq(&v(json!({"a": 0, "b": 0}))));
    assert_eq!(report.applied, 2);
}

#[test]
fn root_replacement() {
    let pattern = Pattern::compile("$x").unwrap();
    let out = pattern.on(&v(json!(5))).replace(9).unwrap();
    assert!(out.deep_eq(&v(json!(9))));
}

#[test]
fn find_and_replace_all() {
    let pattern = Pattern::compile("3").unwrap();
    let data = v(json!([1, 3, 3]));
    let found = pattern.find(&data).unwrap();
    assert_eq!(found.count(), 2);
    let out = found.replace_all(&data, 9).unwrap();
    assert!(out.deep_eq(&v(json!([1, 9, 9]))));
}

#[test]
fn key_rename_preserves_position() {
    let pattern = Pattern::compile("{ (old as $k): _, %? }").unwrap();
    let data = v(json!({"old": 1, "b": 2}));
    let (out, report) = pattern
        .on(&data)
        .edit(&EditPlan::new().set("k", "new"), EditOptions::new())
        .unwrap();
    assert_eq!(out.to_json(), r#"{"new":1,"b":2}"#);
    assert_eq!(report.applied, 1);
}

#[test]
fn array_splices_offset_left_to_right() {
    let pattern = Pattern::compile("@[2 3]").unwrap();
    let data = v(json!([1, 2, 3, 2, 3]));
    let found = pattern.find(&data).unwrap();
    assert_eq!(found.count(), 2);
    let out = found.replace_all(&data, v(json!([9]))).unwrap();
    assert!(out.deep_eq(&v(json!([1, 9, 9]))));
}

#[test]
fn object_slice_swap_rewrites_keys() {
    let pattern = Pattern::compile("%{ x: 1 }").unwrap();
    let data = v(json!({"x": 1, "y": 2}));
    let found = pattern.find(&data).unwrap();
    assert_eq!(found.count(), 1);
    let out = found.replace_all(&data, v(json!({"z": 5}))).unwrap();
    assert_eq!(out.to_json(), r#"{"y":2,"z":5}"#);
}

#[test]
fn cas_failure_skips_and_records() {
    let pattern = Pattern::compile("{ a: $x, %? }").unwrap();
    let scanned = v(json!({"a": 1}));
    let found = pattern.find(&scanned).unwrap();

    // The data drifts between the scan and the edit.
    let mut drifted = v(json!({"a": 5}));
    let report = found
        .edit_all_in(&mut drifted, &EditPlan::new().set("x", 9), EditOptions::new())
        .unwrap();
    assert_eq!(report.applied, 0);
    assert_eq!(report.cas_failures.len(), 1);
    assert!(drifted.deep_eq(&v(json!({"a": 5}))));

    let failure = &report.cas_failures[0];
    assert!(failure.expected.deep_eq(&v(json!(1))));
    assert!(failure.actual.as_ref().unwrap().deep_eq(&v(json!(5))));
    assert!(failure.attempted.deep_eq(&v(json!(9))));
}

#[test]
fn cas_failure_can_force() {
    let pattern = Pattern::compile("{ a: $x, %? }").unwrap();
    let scanned = v(json!({"a": 1}));
    let found = pattern.find(&scanned).unwrap();

    let mut drifted = v(json!({"a": 5}));
    let options = EditOptions::new().on_cas_failure(|_| CasAction::Force);
    let report = found
        .edit_all_in(&mut drifted, &EditPlan::new().set("x", 9), options)
        .unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.cas_failures.len(), 1);
    assert!(drifted.deep_eq(&v(json!({"a": 9}))));
}

#[test]
fn disagreeing_solutions_conflict() {
    // Both alternatives match the same site with different plan entries.
    let pattern = Pattern::compile("{ a: ($x | $y), %? }").unwrap();
    let data = v(json!({"a": 1}));
    let (out, report) = pattern
        .on(&data)
        .edit(
            &EditPlan::new().set("x", 10).set("y", 20),
            EditOptions::new(),
        )
        .unwrap();
    assert_eq!(report.conflicts.len(), 1);
    // Default policy keeps the first planned value.
    assert!(out.deep_eq(&v(json!({"a": 10}))));
}

#[test]
fn slice_replacement_shape_is_checked() {
    let pattern = Pattern::compile("@[2]").unwrap();
    let data = v(json!([2]));
    let found = pattern.find(&data).unwrap();
    let err = found.replace_all(&data, 5).unwrap_err();
    assert!(matches!(err, EditError::ShapeMismatch { .. }));
}

#[test]
fn per_occurrence_replacement() {
    let pattern = Pattern::compile("_number").unwrap();
    let data = v(json!([1, 2]));
    let found = pattern.find(&data).unwrap();
    let out = found
        .replace_all_with(&data, |sol| {
            Value::Num(sol.get("0").and_then(Value::as_num).unwrap() + 10.0)
        })
        .unwrap();
    assert!(out.deep_eq(&v(json!([11, 12]))));
}
