// Copyright 2018-2025 the Deno authors. MIT license.

use crate::error::ConversionError;
use indexmap::IndexMap;
use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;
use serde::ser::SerializeSeq;

/// A script value in native form.
///
/// This is what [`ScriptBridge::evaluate`](crate::ScriptBridge::evaluate)
/// and [`ScriptBridge::call`](crate::ScriptBridge::call) return, and what
/// exposed native methods receive as arguments. Numbers are always `f64`,
/// as they are in JavaScript. Objects keep their keys in JavaScript
/// property order.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
  #[default]
  Undefined,
  Null,
  Bool(bool),
  Number(f64),
  String(String),
  Array(Vec<Value>),
  Object(IndexMap<String, Value>),
}

impl Value {
  /// The JavaScript-ish name of this value's type, used in error messages.
  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Undefined => "undefined",
      Value::Null => "null",
      Value::Bool(_) => "boolean",
      Value::Number(_) => "number",
      Value::String(_) => "string",
      Value::Array(_) => "array",
      Value::Object(_) => "object",
    }
  }

  pub fn is_undefined(&self) -> bool {
    matches!(self, Value::Undefined)
  }

  pub fn is_null_or_undefined(&self) -> bool {
    matches!(self, Value::Undefined | Value::Null)
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Number(n) => Some(*n),
      _ => None,
    }
  }

  /// Returns the number as an integer if it is finite and has no fractional
  /// part.
  pub fn as_i64(&self) -> Option<i64> {
    let n = self.as_f64()?;
    if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
      Some(n as i64)
    } else {
      None
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&[Value]> {
    match self {
      Value::Array(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
    match self {
      Value::Object(map) => Some(map),
      _ => None,
    }
  }

  /// Looks up `key` if this is an object.
  pub fn get(&self, key: &str) -> Option<&Value> {
    self.as_object()?.get(key)
  }

  fn unexpected(&self, expected: &'static str) -> ConversionError {
    ConversionError::Unexpected {
      expected,
      found: self.type_name(),
    }
  }
}

macro_rules! impl_from_number {
  ($($t:ty),*) => {
    $(
      impl From<$t> for Value {
        #[inline]
        fn from(n: $t) -> Self {
          Value::Number(n as f64)
        }
      }
    )*
  };
}

impl_from_number!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

impl From<()> for Value {
  fn from(_: ()) -> Self {
    Value::Undefined
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(s.to_owned())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::String(s)
  }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(items: Vec<T>) -> Self {
    Value::Array(items.into_iter().map(Into::into).collect())
  }
}

impl From<IndexMap<String, Value>> for Value {
  fn from(map: IndexMap<String, Value>) -> Self {
    Value::Object(map)
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(Value::Null)
  }
}

impl FromIterator<Value> for Value {
  fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
    Value::Array(iter.into_iter().collect())
  }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
  fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
    Value::Object(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
  }
}

impl From<serde_json::Value> for Value {
  fn from(value: serde_json::Value) -> Self {
    match value {
      serde_json::Value::Null => Value::Null,
      serde_json::Value::Bool(b) => Value::Bool(b),
      serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
      serde_json::Value::String(s) => Value::String(s),
      serde_json::Value::Array(items) => {
        Value::Array(items.into_iter().map(Value::from).collect())
      }
      serde_json::Value::Object(map) => Value::Object(
        map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
      ),
    }
  }
}

impl TryFrom<Value> for String {
  type Error = ConversionError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    match value {
      Value::String(s) => Ok(s),
      other => Err(other.unexpected("string")),
    }
  }
}

impl TryFrom<Value> for f64 {
  type Error = ConversionError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    value.as_f64().ok_or_else(|| value.unexpected("number"))
  }
}

impl TryFrom<Value> for bool {
  type Error = ConversionError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    value.as_bool().ok_or_else(|| value.unexpected("boolean"))
  }
}

impl TryFrom<Value> for Vec<Value> {
  type Error = ConversionError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    match value {
      Value::Array(items) => Ok(items),
      other => Err(other.unexpected("array")),
    }
  }
}

// `undefined` has no JSON form, so it is written as `null`. Integral numbers
// are written as integers.
impl Serialize for Value {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Value::Undefined | Value::Null => serializer.serialize_unit(),
      Value::Bool(b) => serializer.serialize_bool(*b),
      Value::Number(_) => match self.as_i64() {
        Some(i) => serializer.serialize_i64(i),
        None => serializer.serialize_f64(self.as_f64().unwrap_or(f64::NAN)),
      },
      Value::String(s) => serializer.serialize_str(s),
      Value::Array(items) => {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
          seq.serialize_element(item)?;
        }
        seq.end()
      }
      Value::Object(map) => {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (key, item) in map {
          out.serialize_entry(key, item)?;
        }
        out.end()
      }
    }
  }
}
