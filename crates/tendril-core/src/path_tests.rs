use crate::path::{Path, Step};
use crate::value::Value;

fn sample() -> Value {
    Value::from_json(r#"{"users": [{"name": "ada"}, {"name": "bob"}]}"#).unwrap()
}

#[test]
fn get_resolves_nested_steps() {
    let root = sample();
    let path: Path = vec![
        Step::Key("users".into()),
        Step::Index(1),
        Step::Key("name".into()),
    ]
    .into();
    assert_eq!(path.get(&root).and_then(Value::as_str), Some("bob"));
}

#[test]
fn get_fails_on_missing_or_mismatched_steps() {
    let root = sample();
    assert!(Path::from(vec![Step::Key("nope".into())]).get(&root).is_none());
    // Index step against a mapping.
    assert!(Path::from(vec![Step::Index(0)]).get(&root).is_none());
}

#[test]
fn get_mut_allows_overwrite() {
    let mut root = sample();
    let path: Path = vec![Step::Key("users".into()), Step::Index(0)].into();
    *path.get_mut(&mut root).unwrap() = Value::Null;
    assert!(path.get(&root).unwrap().deep_eq(&Value::Null));
}

#[test]
fn root_path_resolves_to_root() {
    let root = sample();
    assert!(Path::root().get(&root).unwrap().deep_eq(&sample()));
}

#[test]
fn display_quotes_non_bare_keys() {
    let mut path = Path::root();
    path.push("users");
    path.push(0usize);
    path.push("first name");
    assert_eq!(path.to_string(), r#"$.users[0]["first name"]"#);
}

#[test]
fn split_last_and_prefix() {
    let path: Path = vec![Step::Key("a".into()), Step::Index(2)].into();
    let (parent, last) = path.split_last().unwrap();
    assert_eq!(parent.to_string(), "$.a");
    assert_eq!(last, &Step::Index(2));
    assert!(path.starts_with(&parent));
    assert!(!parent.starts_with(&path));
    assert!(Path::root().split_last().is_none());
}
