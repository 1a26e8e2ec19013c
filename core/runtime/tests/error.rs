// Copyright 2018-2025 the Deno authors. MIT license.
use crate::ERROR_DOMAIN;
use crate::EXCEPTION_KEY;
use crate::ErrorKind;
use crate::ScriptBridge;
use crate::Value;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn syntax_error() {
  let mut bridge = ScriptBridge::new();
  let err = bridge
    .evaluate_named("broken.js", "hocuspocus(")
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Compile);
  let exception = err.exception().unwrap();
  assert_eq!(exception.name.as_deref(), Some("SyntaxError"));
  assert_eq!(exception.resource_name.as_deref(), Some("broken.js"));
  assert_eq!(exception.line_number, Some(1));
  assert!(
    exception
      .exception_message
      .starts_with("Uncaught SyntaxError")
  );
}

#[rstest]
#[case("throw 42", Value::from(42))]
#[case("throw 'boom'", Value::from("boom"))]
#[case("throw null", Value::Null)]
#[case("throw [1, 'two']", Value::from(vec![Value::from(1), Value::from("two")]))]
#[case(
  "throw { code: 7, tags: ['a'] }",
  vec![("code", Value::from(7)), ("tags", Value::from(vec!["a"]))].into_iter().collect()
)]
fn thrown_value_is_attached(#[case] script: &str, #[case] expected: Value) {
  let mut bridge = ScriptBridge::new();
  let err = bridge.evaluate(script).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Execution);
  assert_eq!(err.exception().unwrap().value, Some(expected));
}

#[test]
fn thrown_error_object() {
  let mut bridge = ScriptBridge::new();
  let err = bridge.evaluate("throw new TypeError('bad')").unwrap_err();
  let exception = err.exception().unwrap();
  assert_eq!(exception.name.as_deref(), Some("TypeError"));
  assert_eq!(exception.message.as_deref(), Some("bad"));
  assert_eq!(exception.exception_message, "Uncaught TypeError: bad");
  let value = exception.value.as_ref().unwrap();
  assert_eq!(value.get("name"), Some(&Value::from("TypeError")));
  assert_eq!(value.get("message"), Some(&Value::from("bad")));
  assert!(exception.stack.as_deref().unwrap().contains("TypeError: bad"));
  assert!(err.to_string().starts_with("Uncaught TypeError: bad"));
}

#[test]
fn thrown_subclass_is_an_error() {
  let mut bridge = ScriptBridge::new();
  let err = bridge
    .evaluate(
      "class AppError extends Error { constructor(m) { super(m); this.name = 'AppError'; } }
       throw new AppError('nope')",
    )
    .unwrap_err();
  let exception = err.exception().unwrap();
  assert_eq!(exception.name.as_deref(), Some("AppError"));
  assert_eq!(exception.exception_message, "Uncaught AppError: nope");
}

#[test]
fn unconvertible_thrown_value() {
  let mut bridge = ScriptBridge::new();
  let err = bridge.evaluate("throw function f() {}").unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Execution);
  let exception = err.exception().unwrap();
  assert_eq!(exception.value, None);
  assert!(exception.exception_message.starts_with("Uncaught"));
}

#[test]
fn error_json_carries_domain_and_exception() {
  let mut bridge = ScriptBridge::new();
  let err = bridge.evaluate("throw 'boom'").unwrap_err();
  assert_eq!(err.domain(), ERROR_DOMAIN);
  let json = err.to_json();
  assert_eq!(json["domain"], ERROR_DOMAIN);
  assert_eq!(json["kind"], "ExecutionError");
  assert_eq!(json[EXCEPTION_KEY]["value"], "boom");
  assert_eq!(json[EXCEPTION_KEY]["exceptionMessage"], "Uncaught boom");

  let err = bridge.call("missing", &[]).unwrap_err();
  let json = err.to_json();
  assert_eq!(json["kind"], "LookupError");
  assert!(json.get(EXCEPTION_KEY).is_none());
}

#[test]
fn error_keeps_own_properties_and_cause() {
  let mut bridge = ScriptBridge::new();
  let err = bridge
    .evaluate(
      "const e = new Error('x', { cause: new RangeError('inner') });
       e.code = 'E1';
       e.details = { retry: false };
       throw e",
    )
    .unwrap_err();
  let exception = err.exception().unwrap();
  let value = exception.value.as_ref().unwrap();
  assert_eq!(value.get("message"), Some(&Value::from("x")));
  assert_eq!(value.get("code"), Some(&Value::from("E1")));
  assert_eq!(
    value.get("details"),
    Some(&vec![("retry", Value::from(false))].into_iter().collect())
  );

  let cause = exception.cause.as_deref().unwrap();
  assert_eq!(cause.name.as_deref(), Some("RangeError"));
  assert_eq!(cause.message.as_deref(), Some("inner"));
  assert_eq!(
    value.get("cause").and_then(|cause| cause.get("message")),
    Some(&Value::from("inner"))
  );
}

#[test]
fn thrown_value_cause_is_converted() {
  let mut bridge = ScriptBridge::new();
  let err = bridge
    .evaluate("throw new Error('outer', { cause: { status: 503 } })")
    .unwrap_err();
  let exception = err.exception().unwrap();
  let cause = exception.cause.as_deref().unwrap();
  assert_eq!(
    cause.value,
    Some(vec![("status", Value::from(503))].into_iter().collect())
  );
  assert_eq!(cause.name, None);
}

#[test]
fn cyclic_cause_chain_terminates() {
  let mut bridge = ScriptBridge::new();
  let err = bridge
    .evaluate(
      "const a = new Error('a'); const b = new Error('b', { cause: a });
       a.cause = b;
       throw a",
    )
    .unwrap_err();
  let exception = err.exception().unwrap();
  let b = exception.cause.as_deref().unwrap();
  assert_eq!(b.message.as_deref(), Some("b"));
  let a = b.cause.as_deref().unwrap();
  assert_eq!(a.message.as_deref(), Some("a"));
  assert!(a.cause.is_none());
}
