// Copyright 2018-2025 the Deno authors. MIT license.

use crate::error::ConversionError;
use crate::values::Value;
use indexmap::IndexMap;

/// Nesting limit used when no [`BridgeOptions`](crate::BridgeOptions) are at
/// hand. Cyclic structures hit it instead of recursing forever.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Largest array length (or own property count) converted by default.
pub const DEFAULT_MAX_LENGTH: usize = 1_000_000;

/// Bounds applied while converting script values to [`Value`].
///
/// Both come from the script, so neither the nesting nor the size of a value
/// is trusted: a sparse array can report a length of `2 ** 32 - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionLimits {
  pub max_depth: usize,
  pub max_length: usize,
}

impl Default for ConversionLimits {
  fn default() -> Self {
    Self {
      max_depth: DEFAULT_MAX_DEPTH,
      max_length: DEFAULT_MAX_LENGTH,
    }
  }
}

impl ConversionLimits {
  /// The limits for values nested one level below the current one.
  pub(crate) fn nested(self) -> Self {
    Self {
      max_depth: self.max_depth.saturating_sub(1),
      ..self
    }
  }
}

/// A conversion from a rust value to a v8 value.
///
/// When passing data from Rust into JS, either as the arguments of
/// [`ScriptBridge::call`](crate::ScriptBridge::call) or as the return value
/// of an exposed native method, the data is serialized into a native V8
/// value through this trait.
pub trait ToV8<'a> {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Converts the value to a V8 value.
  fn to_v8(
    self,
    scope: &mut v8::HandleScope<'a>,
  ) -> Result<v8::Local<'a, v8::Value>, Self::Error>;
}

/// A conversion from a v8 value to a rust value.
///
/// Script results and the arguments scripts pass to exposed native methods
/// arrive as [`v8::Local<v8::Value>`] and are converted through this trait.
pub trait FromV8<'a>: Sized {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Converts a V8 value to a Rust value.
  fn from_v8(
    scope: &mut v8::HandleScope<'a>,
    value: v8::Local<'a, v8::Value>,
  ) -> Result<Self, Self::Error>;
}

impl<'a> ToV8<'a> for &Value {
  type Error = ConversionError;

  fn to_v8(
    self,
    scope: &mut v8::HandleScope<'a>,
  ) -> Result<v8::Local<'a, v8::Value>, Self::Error> {
    let value: v8::Local<v8::Value> = match self {
      Value::Undefined => v8::undefined(scope).into(),
      Value::Null => v8::null(scope).into(),
      Value::Bool(b) => v8::Boolean::new(scope, *b).into(),
      Value::Number(n) => v8::Number::new(scope, *n).into(),
      Value::String(s) => v8_string(scope, s)?.into(),
      Value::Array(items) => {
        let elements = items
          .iter()
          .map(|item| item.to_v8(scope))
          .collect::<Result<Vec<_>, _>>()?;
        v8::Array::new_with_elements(scope, &elements).into()
      }
      Value::Object(map) => {
        let object = v8::Object::new(scope);
        for (key, item) in map {
          let key = v8_string(scope, key)?;
          let item = item.to_v8(scope)?;
          // Define rather than assign, so keys like `__proto__` stay data.
          object.create_data_property(scope, key.into(), item);
        }
        object.into()
      }
    };
    Ok(value)
  }
}

impl<'a> ToV8<'a> for Value {
  type Error = ConversionError;

  #[inline]
  fn to_v8(
    self,
    scope: &mut v8::HandleScope<'a>,
  ) -> Result<v8::Local<'a, v8::Value>, Self::Error> {
    (&self).to_v8(scope)
  }
}

impl<'a> FromV8<'a> for Value {
  type Error = ConversionError;

  #[inline]
  fn from_v8(
    scope: &mut v8::HandleScope<'a>,
    value: v8::Local<'a, v8::Value>,
  ) -> Result<Self, Self::Error> {
    from_v8_with_limits(scope, value, ConversionLimits::default())
  }
}

/// Converts `value` to a [`Value`], failing once arrays and objects nest
/// deeper than `limits.max_depth` or hold more than `limits.max_length`
/// elements.
pub fn from_v8_with_limits(
  scope: &mut v8::HandleScope,
  value: v8::Local<v8::Value>,
  limits: ConversionLimits,
) -> Result<Value, ConversionError> {
  Converter { limits }.convert(scope, value, limits.max_depth)
}

pub(crate) fn v8_string<'a>(
  scope: &mut v8::HandleScope<'a>,
  s: &str,
) -> Result<v8::Local<'a, v8::String>, ConversionError> {
  v8::String::new(scope, s).ok_or(ConversionError::StringTooLong)
}

struct Converter {
  limits: ConversionLimits,
}

impl Converter {
  fn check_length(&self, length: u32) -> Result<usize, ConversionError> {
    let length = length as usize;
    if length > self.limits.max_length {
      return Err(ConversionError::TooLarge {
        limit: self.limits.max_length,
      });
    }
    Ok(length)
  }

  fn convert(
    &self,
    scope: &mut v8::HandleScope,
    value: v8::Local<v8::Value>,
    remaining: usize,
  ) -> Result<Value, ConversionError> {
    if value.is_undefined() {
      return Ok(Value::Undefined);
    }
    if value.is_null() {
      return Ok(Value::Null);
    }
    if value.is_boolean() {
      return Ok(Value::Bool(value.is_true()));
    }
    if value.is_number() {
      return Ok(Value::Number(value.number_value(scope).unwrap_or(f64::NAN)));
    }
    if value.is_string() {
      return Ok(Value::String(value.to_rust_string_lossy(scope)));
    }
    if let Some(type_name) = unsupported_type_name(&value) {
      return Err(ConversionError::Unsupported { type_name });
    }
    if remaining == 0 {
      return Err(ConversionError::TooDeep {
        limit: self.limits.max_depth,
      });
    }

    let scope = &mut v8::HandleScope::new(scope);
    if let Ok(array) = v8::Local::<v8::Array>::try_from(value) {
      let length = self.check_length(array.length())?;
      let mut items = Vec::with_capacity(length);
      for index in 0..array.length() {
        let item = array
          .get_index(scope, index)
          .ok_or_else(|| ConversionError::PropertyAccess {
            key: index.to_string(),
          })?;
        items.push(self.convert(scope, item, remaining - 1)?);
      }
      return Ok(Value::Array(items));
    }

    let Ok(object) = v8::Local::<v8::Object>::try_from(value) else {
      return Err(ConversionError::Unsupported {
        type_name: "value",
      });
    };
    let args = v8::GetPropertyNamesArgsBuilder::new()
      .key_conversion(v8::KeyConversionMode::ConvertToString)
      .build();
    let names = object
      .get_own_property_names(scope, args)
      .ok_or_else(|| ConversionError::PropertyAccess { key: "*".into() })?;
    let length = self.check_length(names.length())?;
    let mut map = IndexMap::with_capacity(length);
    for index in 0..names.length() {
      let Some(key) = names.get_index(scope, index) else {
        continue;
      };
      let name = key.to_rust_string_lossy(scope);
      let Some(item) = object.get(scope, key) else {
        return Err(ConversionError::PropertyAccess { key: name });
      };
      let item = self.convert(scope, item, remaining - 1)?;
      map.insert(name, item);
    }
    Ok(Value::Object(map))
  }
}

fn unsupported_type_name(value: &v8::Value) -> Option<&'static str> {
  let type_name = if value.is_function() {
    "function"
  } else if value.is_symbol() || value.is_symbol_object() {
    "symbol"
  } else if value.is_big_int() || value.is_big_int_object() {
    "bigint"
  } else if value.is_promise() {
    "promise"
  } else if value.is_proxy() {
    "proxy"
  } else if value.is_map() || value.is_weak_map() {
    "map"
  } else if value.is_set() || value.is_weak_set() {
    "set"
  } else if value.is_date() {
    "date"
  } else if value.is_reg_exp() {
    "regexp"
  } else if value.is_array_buffer()
    || value.is_shared_array_buffer()
    || value.is_array_buffer_view()
  {
    "binary data"
  } else if value.is_number_object()
    || value.is_string_object()
    || value.is_boolean_object()
  {
    "wrapper object"
  } else if value.is_external() {
    "external"
  } else {
    return None;
  };
  Some(type_name)
}
