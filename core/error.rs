// Copyright 2018-2025 the Deno authors. MIT license.

use crate::convert::ConversionLimits;
use crate::convert::from_v8_with_limits;
use crate::values::Value;
use deno_error::JsErrorClass;
use indexmap::IndexMap;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

/// Identifies errors produced by a [`ScriptBridge`](crate::ScriptBridge).
pub const ERROR_DOMAIN: &str = "ScriptBridgeErrorDomain";

/// Key under which the original script exception is attached in
/// [`ScriptError::to_json`].
pub const EXCEPTION_KEY: &str = "ScriptBridgeException";

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum ErrorKind {
  /// The script text is not valid JavaScript.
  #[serde(rename = "CompileError")]
  Compile,
  /// The script threw while running.
  #[serde(rename = "ExecutionError")]
  Execution,
  /// A named global is missing or is not a function.
  #[serde(rename = "LookupError")]
  Lookup,
  /// A value has no native or script mapping.
  #[serde(rename = "ConversionError")]
  Conversion,
  /// An exposed native object was dropped before a script called into it.
  #[serde(rename = "LifetimeError")]
  Lifetime,
}

impl ErrorKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ErrorKind::Compile => "CompileError",
      ErrorKind::Execution => "ExecutionError",
      ErrorKind::Lookup => "LookupError",
      ErrorKind::Conversion => "ConversionError",
      ErrorKind::Lifetime => "LifetimeError",
    }
  }
}

impl Display for ErrorKind {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error, deno_error::JsError)]
#[class(type)]
pub enum ConversionError {
  #[error("Cannot convert a {type_name} to a native value")]
  Unsupported { type_name: &'static str },
  #[error("Value is nested deeper than {limit} levels (is it cyclic?)")]
  TooDeep { limit: usize },
  #[error("Value has more than {limit} elements")]
  TooLarge { limit: usize },
  #[error("String is too long to be passed to the script engine")]
  StringTooLong,
  #[error("Reading property '{key}' threw an exception")]
  PropertyAccess { key: String },
  #[error("Expected {expected}, found {found}")]
  Unexpected {
    expected: &'static str,
    found: &'static str,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupFailure {
  NotDefined,
  NotCallable,
}

impl Display for LookupFailure {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      LookupFailure::NotDefined => f.write_str("is not defined"),
      LookupFailure::NotCallable => f.write_str("is not a function"),
    }
  }
}

/// The error type of every [`ScriptBridge`](crate::ScriptBridge) operation.
///
/// A failed operation never poisons the bridge; the context stays usable.
/// Use [`ScriptError::kind`] to tell the failure classes apart and
/// [`ScriptError::exception`] to recover the value the script threw.
#[derive(Debug, thiserror::Error, deno_error::JsError)]
pub enum ScriptError {
  #[class(generic)]
  #[error("{0}")]
  Compile(JsException),
  #[class(generic)]
  #[error("{0}")]
  Execution(JsException),
  #[class(type)]
  #[error("{name} {reason}")]
  Lookup { name: String, reason: LookupFailure },
  #[class(inherit)]
  #[error(transparent)]
  Conversion(#[from] ConversionError),
  #[class(type)]
  #[error("{object}.{method} was called after its native object was dropped")]
  Lifetime { object: String, method: String },
  /// A native method failed and the script did not catch the exception it
  /// was turned into.
  #[class(generic)]
  #[error("{error}")]
  Native {
    #[source]
    error: Box<ScriptError>,
    exception: JsException,
  },
}

impl ScriptError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ScriptError::Compile(_) => ErrorKind::Compile,
      ScriptError::Execution(_) => ErrorKind::Execution,
      ScriptError::Lookup { .. } => ErrorKind::Lookup,
      ScriptError::Conversion(_) => ErrorKind::Conversion,
      ScriptError::Lifetime { .. } => ErrorKind::Lifetime,
      ScriptError::Native { error, .. } => error.kind(),
    }
  }

  pub fn domain(&self) -> &'static str {
    ERROR_DOMAIN
  }

  /// The exception raised inside the script engine, if any.
  pub fn exception(&self) -> Option<&JsException> {
    match self {
      ScriptError::Compile(exception)
      | ScriptError::Execution(exception)
      | ScriptError::Native { exception, .. } => Some(exception),
      _ => None,
    }
  }

  pub(crate) fn lookup(name: &str, reason: LookupFailure) -> Self {
    ScriptError::Lookup {
      name: name.to_string(),
      reason,
    }
  }

  /// Renders the error as a JSON object keyed by [`ERROR_DOMAIN`] fields,
  /// with the script exception under [`EXCEPTION_KEY`].
  pub fn to_json(&self) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("domain".into(), self.domain().into());
    map.insert("kind".into(), self.kind().as_str().into());
    map.insert("message".into(), self.to_string().into());
    if let Some(exception) = self.exception() {
      map.insert(
        EXCEPTION_KEY.into(),
        serde_json::to_value(exception).unwrap_or_default(),
      );
    }
    serde_json::Value::Object(map)
  }

  /// Throws this error into the script as a JS exception of the matching
  /// class.
  pub(crate) fn to_v8_exception<'s>(
    &self,
    scope: &mut v8::HandleScope<'s>,
  ) -> v8::Local<'s, v8::Value> {
    let message = v8::String::new(scope, &self.get_message())
      .unwrap_or_else(|| v8::String::empty(scope));
    match &*self.get_class() {
      deno_error::builtin_classes::TYPE_ERROR => {
        v8::Exception::type_error(scope, message)
      }
      deno_error::builtin_classes::RANGE_ERROR => {
        v8::Exception::range_error(scope, message)
      }
      _ => v8::Exception::error(scope, message),
    }
  }
}

/// A snapshot of an exception thrown inside the script engine.
///
/// `value` holds the thrown value in native form. For `Error` objects it is
/// an object with the error's `name`, `message` and `stack`, its own
/// enumerable properties (such as a `code`) and the value of its `cause`.
/// For values that cannot be converted it is `None`.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsException {
  pub value: Option<Value>,
  pub exception_message: String,
  pub name: Option<String>,
  pub message: Option<String>,
  pub stack: Option<String>,
  pub cause: Option<Box<JsException>>,
  pub resource_name: Option<String>,
  pub line_number: Option<i64>,
  pub column_number: Option<i64>,
}

impl JsException {
  pub fn from_v8_exception(
    scope: &mut v8::HandleScope,
    exception: v8::Local<v8::Value>,
    limits: ConversionLimits,
  ) -> Self {
    Self::inner_from_v8_exception(scope, exception, limits, &mut Vec::new())
  }

  fn inner_from_v8_exception(
    scope: &mut v8::HandleScope,
    exception: v8::Local<v8::Value>,
    limits: ConversionLimits,
    seen: &mut Vec<v8::Global<v8::Object>>,
  ) -> Self {
    // Create a new HandleScope because we're creating a lot of new local
    // handles below.
    let scope = &mut v8::HandleScope::new(scope);

    let msg = v8::Exception::create_message(scope, exception);
    let resource_name = msg
      .get_script_resource_name(scope)
      .filter(|name| name.is_string())
      .map(|name| name.to_rust_string_lossy(scope));
    let line_number = msg.get_line_number(scope).map(|n| n as i64);
    let column_number = line_number.map(|_| msg.get_start_column() as i64 + 1);

    let error_object = is_instance_of_error(scope, exception)
      .then(|| v8::Local::<v8::Object>::try_from(exception).ok())
      .flatten();

    let Some(error) = error_object else {
      let exception_message = msg.get(scope).to_rust_string_lossy(scope);
      return JsException {
        value: from_v8_with_limits(scope, exception, limits).ok(),
        exception_message,
        resource_name,
        line_number,
        column_number,
        ..Default::default()
      };
    };

    let name = get_string_property(scope, error, "name");
    let message = get_string_property(scope, error, "message");
    let stack = get_string_property(scope, error, "stack");
    let exception_message = match (name.as_deref(), message.as_deref()) {
      (Some(name), Some(message)) if !name.is_empty() && !message.is_empty() => {
        format!("Uncaught {name}: {message}")
      }
      (Some(name), _) if !name.is_empty() => format!("Uncaught {name}"),
      (_, Some(message)) if !message.is_empty() => {
        format!("Uncaught {message}")
      }
      _ => "Uncaught".to_string(),
    };

    // A cause chain may loop back on itself.
    let cause = match get_property(scope, error, "cause") {
      Some(cause) if !cause.is_undefined() && !was_seen(scope, seen, error) => {
        seen.push(v8::Global::new(scope, error));
        Some(Box::new(Self::inner_from_v8_exception(
          scope, cause, limits, seen,
        )))
      }
      _ => None,
    };

    let mut value = IndexMap::new();
    let fields = [("name", &name), ("message", &message), ("stack", &stack)];
    for (key, field) in fields {
      if let Some(field) = field {
        value.insert(key.to_string(), Value::from(field.as_str()));
      }
    }
    value.extend(own_enumerable_properties(scope, error, limits.nested()));
    if let Some(cause_value) = cause.as_ref().and_then(|c| c.value.clone()) {
      value.insert("cause".to_string(), cause_value);
    }

    JsException {
      value: Some(Value::Object(value)),
      exception_message,
      name,
      message,
      stack,
      cause,
      resource_name,
      line_number,
      column_number,
    }
  }

  /// An `Error` that was never thrown by script code, such as a failure the
  /// engine reports without an exception.
  pub(crate) fn uncaught_error(message: &str) -> Self {
    JsException {
      exception_message: format!("Uncaught Error: {message}"),
      name: Some("Error".to_string()),
      message: Some(message.to_string()),
      ..Default::default()
    }
  }

  /// Stands in for an exception when V8 stopped without raising one.
  pub(crate) fn terminated() -> Self {
    Self::uncaught_error("execution terminated")
  }
}

impl Display for JsException {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.write_str(&self.exception_message)?;
    if let (Some(resource_name), Some(line), Some(column)) =
      (&self.resource_name, self.line_number, self.column_number)
    {
      write!(f, "\n    at {resource_name}:{line}:{column}")?;
    }
    Ok(())
  }
}

fn get_property<'s>(
  scope: &mut v8::HandleScope<'s>,
  object: v8::Local<v8::Object>,
  key: &str,
) -> Option<v8::Local<'s, v8::Value>> {
  let key = v8::String::new(scope, key)?;
  object.get(scope, key.into())
}

fn get_string_property(
  scope: &mut v8::HandleScope,
  object: v8::Local<v8::Object>,
  key: &str,
) -> Option<String> {
  let value = get_property(scope, object, key)?;
  value.is_string().then(|| value.to_rust_string_lossy(scope))
}

/// Converts the own enumerable properties of `object`, skipping any that
/// throw or cannot be converted.
fn own_enumerable_properties(
  scope: &mut v8::HandleScope,
  object: v8::Local<v8::Object>,
  limits: ConversionLimits,
) -> Vec<(String, Value)> {
  let args = v8::GetPropertyNamesArgsBuilder::new()
    .key_conversion(v8::KeyConversionMode::ConvertToString)
    .build();
  let Some(names) = object.get_own_property_names(scope, args) else {
    return vec![];
  };
  let length = names
    .length()
    .min(u32::try_from(limits.max_length).unwrap_or(u32::MAX));
  (0..length)
    .filter_map(|index| {
      let key = names.get_index(scope, index)?;
      let item = object.get(scope, key)?;
      let item = from_v8_with_limits(scope, item, limits).ok()?;
      Some((key.to_rust_string_lossy(scope), item))
    })
    .collect()
}

fn was_seen(
  scope: &mut v8::HandleScope,
  seen: &[v8::Global<v8::Object>],
  object: v8::Local<v8::Object>,
) -> bool {
  seen
    .iter()
    .any(|other| v8::Local::new(scope, other).strict_equals(object.into()))
}

/// Walks the prototype chain of `value` looking for `Error.prototype`.
pub(crate) fn is_instance_of_error(
  scope: &mut v8::HandleScope,
  value: v8::Local<v8::Value>,
) -> bool {
  if !value.is_object() {
    return false;
  }
  let message = v8::String::empty(scope);
  let Some(error_prototype) = v8::Exception::error(scope, message)
    .to_object(scope)
    .and_then(|error| error.get_prototype(scope))
  else {
    return false;
  };
  let mut maybe_prototype =
    value.to_object(scope).and_then(|object| object.get_prototype(scope));
  while let Some(prototype) = maybe_prototype {
    if !prototype.is_object() {
      return false;
    }
    if prototype.strict_equals(error_prototype) {
      return true;
    }
    maybe_prototype = prototype
      .to_object(scope)
      .and_then(|prototype| prototype.get_prototype(scope));
  }
  false
}
