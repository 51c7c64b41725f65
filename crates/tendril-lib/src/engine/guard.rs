//! Strict evaluator for the guard expression sub-language.
//!
//! Evaluation is total over well-typed inputs and fails the branch on any
//! type mismatch. Guards never abort the search; a failing or ill-typed
//! guard only prunes.

use indexmap::IndexMap;

use tendril_core::Value;
use tendril_core::value::num_eq;

use crate::parser::ast::{BinaryOp, CallFunc, Expr, UnaryOp};

use super::solution::Binding;

/// A branch-local evaluation failure: type error or unbound variable.
pub(crate) struct GuardFail;

type EvalResult = Result<Value, GuardFail>;

/// Evaluates `expr` as a guard: the result must be a boolean, and only
/// `true` lets the branch live.
pub(crate) fn holds(expr: &Expr, env: &IndexMap<String, Binding>, anon: &Value) -> bool {
    matches!(eval(expr, env, anon), Ok(Value::Bool(true)))
}

fn eval(expr: &Expr, env: &IndexMap<String, Binding>, anon: &Value) -> EvalResult {
    match expr {
        Expr::Num(n) => Ok(Value::Num(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Anon => Ok(anon.clone()),
        Expr::Var(name) => match env.get(name) {
            Some(binding) => Ok(binding.value().clone()),
            None => Err(GuardFail),
        },
        Expr::Unary { op, expr } => {
            let value = eval(expr, env, anon)?;
            match (op, value) {
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOp::Neg, Value::Num(n)) => Ok(Value::Num(-n)),
                _ => Err(GuardFail),
            }
        }
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, env, anon),
        Expr::Call { func, arg } => {
            let value = eval(arg, env, anon)?;
            eval_call(*func, value)
        }
    }
}

fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    env: &IndexMap<String, Binding>,
    anon: &Value,
) -> EvalResult {
    // Short-circuit forms evaluate the right side lazily.
    if let BinaryOp::And | BinaryOp::Or = op {
        let left = match eval(lhs, env, anon)? {
            Value::Bool(b) => b,
            _ => return Err(GuardFail),
        };
        let short = match op {
            BinaryOp::And => !left,
            _ => left,
        };
        if short {
            return Ok(Value::Bool(left));
        }
        return match eval(rhs, env, anon)? {
            Value::Bool(b) => Ok(Value::Bool(b)),
            _ => Err(GuardFail),
        };
    }

    let left = eval(lhs, env, anon)?;
    let right = eval(rhs, env, anon)?;

    match op {
        BinaryOp::Eq => Ok(Value::Bool(left.deep_eq(&right))),
        BinaryOp::Ne => Ok(Value::Bool(!left.deep_eq(&right))),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Rem => {
            let (Value::Num(a), Value::Num(b)) = (left, right) else {
                return Err(GuardFail);
            };
            Ok(Value::Num(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => a % b,
            }))
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            let (Value::Num(a), Value::Num(b)) = (left, right) else {
                return Err(GuardFail);
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Gt => a > b,
                BinaryOp::Le => a <= b,
                _ => a >= b,
            }))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

fn eval_call(func: CallFunc, value: Value) -> EvalResult {
    match func {
        CallFunc::Number => match value {
            Value::Num(n) => Ok(Value::Num(n)),
            Value::Bool(b) => Ok(Value::Num(if b { 1.0 } else { 0.0 })),
            Value::Str(s) => match s.trim().parse::<f64>() {
                Ok(n) => Ok(Value::Num(n)),
                Err(_) => Err(GuardFail),
            },
            _ => Err(GuardFail),
        },
        CallFunc::String => match value {
            Value::Str(s) => Ok(Value::Str(s)),
            Value::Num(n) => Ok(Value::Str(format_number(n))),
            Value::Bool(b) => Ok(Value::Str(b.to_string())),
            Value::Null => Ok(Value::Str("null".to_owned())),
            _ => Err(GuardFail),
        },
        CallFunc::Boolean => Ok(Value::Bool(truthy(&value))),
        CallFunc::Size => match value {
            Value::Str(s) => Ok(Value::Num(s.chars().count() as f64)),
            Value::Seq(items) => Ok(Value::Num(items.len() as f64)),
            Value::Map(map) => Ok(Value::Num(map.len() as f64)),
            _ => Err(GuardFail),
        },
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Num(n) => !num_eq(*n, 0.0) && !n.is_nan(),
        Value::Str(s) => !s.is_empty(),
        Value::Seq(_) | Value::Map(_) => true,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < (i64::MAX as f64) {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
