use indexmap::IndexMap;

use tendril_core::Value;

use crate::parser::ast::{BinaryOp, CallFunc, Expr};

use super::guard::holds;
use super::solution::Binding;

fn env(pairs: &[(&str, Value)]) -> IndexMap<String, Binding> {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_owned(), Binding::Scalar(value.clone())))
        .collect()
}

fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn var(name: &str) -> Expr {
    Expr::Var(name.to_owned())
}

fn call(func: CallFunc, arg: Expr) -> Expr {
    Expr::Call {
        func,
        arg: Box::new(arg),
    }
}

#[test]
fn numeric_comparison() {
    let env = env(&[("x", Value::Num(5.0))]);
    assert!(holds(
        &bin(BinaryOp::Gt, var("x"), Expr::Num(3.0)),
        &env,
        &Value::Null
    ));
    assert!(!holds(
        &bin(BinaryOp::Lt, var("x"), Expr::Num(3.0)),
        &env,
        &Value::Null
    ));
}

#[test]
fn equality_is_deep() {
    let a = Value::from_json(r#"{"k": [1, 2]}"#).unwrap();
    let env = env(&[("x", a)]);
    let expr = bin(BinaryOp::Eq, var("x"), var("x"));
    assert!(holds(&expr, &env, &Value::Null));
}

#[test]
fn anon_refers_to_the_attached_node() {
    let expr = bin(BinaryOp::Ge, Expr::Anon, Expr::Num(2.0));
    assert!(holds(&expr, &env(&[]), &Value::Num(2.0)));
    assert!(!holds(&expr, &env(&[]), &Value::Num(1.0)));
}

#[test]
fn type_mismatch_fails_the_guard() {
    let env = env(&[("s", Value::Str("oops".into()))]);
    let expr = bin(
        BinaryOp::Gt,
        bin(BinaryOp::Add, var("s"), Expr::Num(1.0)),
        Expr::Num(0.0),
    );
    assert!(!holds(&expr, &env, &Value::Null));
}

#[test]
fn non_boolean_result_fails_the_guard() {
    assert!(!holds(
        &bin(BinaryOp::Add, Expr::Num(1.0), Expr::Num(1.0)),
        &env(&[]),
        &Value::Null
    ));
}

#[test]
fn unbound_variable_fails_the_guard() {
    let expr = bin(BinaryOp::Eq, var("missing"), Expr::Num(1.0));
    assert!(!holds(&expr, &env(&[]), &Value::Null));
}

#[test]
fn logic_short_circuits() {
    // The right side would be a type error; `||` never reaches it.
    let broken = bin(
        BinaryOp::Gt,
        bin(BinaryOp::Add, Expr::Num(1.0), Expr::Str("x".into())),
        Expr::Num(0.0),
    );
    let expr = bin(BinaryOp::Or, Expr::Bool(true), broken.clone());
    assert!(holds(&expr, &env(&[]), &Value::Null));

    let expr = bin(BinaryOp::And, Expr::Bool(false), broken);
    assert!(!holds(&expr, &env(&[]), &Value::Null));
}

#[test]
fn casts() {
    let expr = bin(
        BinaryOp::Eq,
        call(CallFunc::Number, Expr::Str("42".into())),
        Expr::Num(42.0),
    );
    assert!(holds(&expr, &env(&[]), &Value::Null));

    let expr = bin(
        BinaryOp::Eq,
        call(CallFunc::String, Expr::Num(3.0)),
        Expr::Str("3".into()),
    );
    assert!(holds(&expr, &env(&[]), &Value::Null));

    let expr = bin(
        BinaryOp::Eq,
        call(CallFunc::Boolean, Expr::Num(0.0)),
        Expr::Bool(false),
    );
    assert!(holds(&expr, &env(&[]), &Value::Null));
}

#[test]
fn size_of_strings_and_containers() {
    let seq = Value::from_json("[1, 2, 3]").unwrap();
    let with_seq = env(&[("xs", seq)]);
    let expr = bin(
        BinaryOp::Eq,
        call(CallFunc::Size, var("xs")),
        Expr::Num(3.0),
    );
    assert!(holds(&expr, &with_seq, &Value::Null));

    let expr = bin(
        BinaryOp::Eq,
        call(CallFunc::Size, Expr::Str("abc".into())),
        Expr::Num(3.0),
    );
    assert!(holds(&expr, &env(&[]), &Value::Null));
}
