// tests/state_tests.rs
mod common;
use common::*;
use mixflow::{MixflowError, Opaque, State, Value};
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_with_and_without_produce_new_snapshots() {
  let original = State::new().with("a", 1);
  let extended = original.with("b", "two");
  let trimmed = extended.without("a");

  assert_eq!(original, state(json!({ "a": 1 })));
  assert_eq!(extended, state(json!({ "a": 1, "b": "two" })));
  assert_eq!(trimmed, state(json!({ "b": "two" })));
  assert_eq!(trimmed.without("missing"), trimmed);
}

#[test]
fn test_get_path_walks_nested_maps() {
  let s = state(json!({ "sub": { "deeper": { "senderAddress": "0x123" } }, "flat": 1 }));
  assert_eq!(
    s.get_path(&["sub", "deeper", "senderAddress"]),
    Some(&Value::Str("0x123".to_string()))
  );
  assert_eq!(s.get_path(&["flat"]), Some(&Value::Int(1)));
  assert_eq!(s.get_path(&["flat", "nope"]), None);
  assert_eq!(s.get_path(&[]), None);
}

#[test]
fn test_require_reports_missing_and_mismatched_keys() {
  let s = state(json!({ "count": 3, "ratio": 0.5, "name": "deployer", "on": true, "cfg": {} }));

  assert_eq!(s.require_i64("count").unwrap(), 3);
  assert_eq!(s.require_f64("ratio").unwrap(), 0.5);
  // Integers widen to floats.
  assert_eq!(s.require_f64("count").unwrap(), 3.0);
  assert_eq!(s.require_str("name").unwrap(), "deployer");
  assert!(s.require_bool("on").unwrap());
  assert!(s.require_map("cfg").unwrap().is_empty());

  match s.require_i64("absent") {
    Err(MixflowError::MissingKey { key }) => assert_eq!(key, "absent"),
    other => panic!("Expected MissingKey, got {:?}", other),
  }
  match s.require_str("count") {
    Err(MixflowError::TypeMismatch { expected, found, .. }) => {
      assert_eq!(expected, "string");
      assert_eq!(found, "int");
    }
    other => panic!("Expected TypeMismatch, got {:?}", other),
  }
}

#[test]
fn test_opaque_handles_downcast_and_compare_by_identity() {
  #[derive(Debug)]
  struct Wallet {
    accounts: usize,
  }

  let shared = Arc::new(Wallet { accounts: 2 });
  let handle = Opaque::from_arc(Arc::clone(&shared));
  let s = State::new().with("wallet", handle.clone());

  let wallet = s.require_opaque::<Wallet>("wallet").unwrap();
  assert!(Arc::ptr_eq(&wallet, &shared));
  assert_eq!(wallet.accounts, 2);
  assert_eq!(handle, handle.clone());
  assert_ne!(handle, Opaque::new(Wallet { accounts: 2 }));

  match s.require_opaque::<String>("wallet") {
    Err(MixflowError::TypeMismatch { found, .. }) => assert!(found.contains("Wallet")),
    other => panic!("Expected TypeMismatch, got {:?}", other),
  }
}

#[test]
fn test_json_bridge() {
  let s = state(json!({ "n": 1, "f": 1.5, "list": [1, "a"], "nested": { "ok": true }, "nothing": null }));
  assert_eq!(s.get("list"), Some(&Value::List(vec![Value::Int(1), Value::from("a")])));
  assert_eq!(s.get("nothing"), Some(&Value::Null));
  assert_eq!(
    s.to_json(),
    json!({ "n": 1, "f": 1.5, "list": [1, "a"], "nested": { "ok": true }, "nothing": null })
  );

  let with_handle = s.with("eth", Opaque::new(42u8));
  assert_eq!(with_handle.to_json()["eth"], json!("<opaque u8>"));

  match State::try_from(json!([1, 2])) {
    Err(MixflowError::InvalidState(msg)) => assert!(msg.contains("list")),
    other => panic!("Expected InvalidState, got {:?}", other),
  }
}

#[test]
fn test_state_from_iterator_and_iteration_order() {
  let s: State = vec![("b", Value::Int(2)), ("a", Value::Int(1))].into_iter().collect();
  assert_eq!(s.keys().collect::<Vec<_>>(), vec!["a", "b"]);
  assert_eq!(s.len(), 2);
  assert!(s.contains_key("a"));
  assert_eq!(format!("{}", s), r#"{"a":1,"b":2}"#);
}
