use crate::value::{Value, num_eq};

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

#[test]
fn deep_eq_scalars() {
    assert!(v(serde_json::json!(null)).deep_eq(&Value::Null));
    assert!(v(serde_json::json!(true)).deep_eq(&Value::Bool(true)));
    assert!(v(serde_json::json!("x")).deep_eq(&Value::Str("x".into())));
    assert!(!v(serde_json::json!(1)).deep_eq(&Value::Str("1".into())));
}

#[test]
fn deep_eq_same_value_zero() {
    assert!(num_eq(f64::NAN, f64::NAN));
    assert!(num_eq(-0.0, 0.0));
    assert!(!num_eq(1.0, 2.0));
    assert!(Value::Num(f64::NAN).deep_eq(&Value::Num(f64::NAN)));
    assert!(Value::Num(-0.0).deep_eq(&Value::Num(0.0)));
}

#[test]
fn deep_eq_structures() {
    let a = v(serde_json::json!({"x": [1, 2, {"y": null}]}));
    let b = v(serde_json::json!({"x": [1, 2, {"y": null}]}));
    let c = v(serde_json::json!({"x": [1, 2, {"y": 0}]}));
    assert!(a.deep_eq(&b));
    assert!(!a.deep_eq(&c));
}

#[test]
fn deep_eq_ignores_key_order() {
    let a = Value::from_json(r#"{"a": 1, "b": 2}"#).unwrap();
    let b = Value::from_json(r#"{"b": 2, "a": 1}"#).unwrap();
    assert!(a.deep_eq(&b));
}

#[test]
fn map_preserves_insertion_order() {
    let value = Value::from_json(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
    let keys: Vec<&str> = value
        .as_map()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, ["z", "a", "m"]);
}

#[test]
fn json_round_trip() {
    let text = r#"{"z":1,"a":[true,null,"s"],"n":1.5}"#;
    let value = Value::from_json(text).unwrap();
    assert_eq!(value.to_json(), text);
}

#[test]
fn integral_numbers_serialize_without_fraction() {
    assert_eq!(Value::Num(3.0).to_json(), "3");
    assert_eq!(Value::Num(3.25).to_json(), "3.25");
}
