// Copyright 2018-2025 the Deno authors. MIT license.

use crate::convert::ConversionLimits;
use crate::error::ScriptError;
use crate::values::Value;
use std::rc::Rc;
use std::rc::Weak;

/// Only methods whose name starts with this prefix are exposed to scripts,
/// under the name with the prefix stripped (`js_ping` becomes `ping`).
pub const SCRIPT_METHOD_PREFIX: &str = "js_";

/// Handler invoked when a script calls an exposed method. It always receives
/// exactly `arity` arguments: missing ones are `Value::Undefined` and extra
/// ones are dropped.
pub type MethodHandler<T> = fn(&T, Vec<Value>) -> Result<Value, ScriptError>;

/// One entry of an [`Exposable`] method table.
pub struct Method<T> {
  pub name: &'static str,
  pub arity: usize,
  pub handler: MethodHandler<T>,
}

impl<T> Method<T> {
  pub const fn new(
    name: &'static str,
    arity: usize,
    handler: MethodHandler<T>,
  ) -> Self {
    Self {
      name,
      arity,
      handler,
    }
  }

  /// The name scripts see, or `None` if the method is not exposed.
  pub fn script_name(&self) -> Option<&'static str> {
    self
      .name
      .strip_prefix(SCRIPT_METHOD_PREFIX)
      .filter(|name| !name.is_empty())
  }
}

impl<T> Clone for Method<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for Method<T> {}

/// A native type whose methods can be installed into a script context with
/// [`ScriptBridge::install`](crate::ScriptBridge::install).
///
/// # Example
///
/// ```
/// use script_bridge::Exposable;
/// use script_bridge::Method;
/// use script_bridge::Value;
///
/// struct Pinger;
///
/// impl Exposable for Pinger {
///   fn methods() -> Vec<Method<Self>> {
///     vec![Method::new("js_ping", 0, |_, _| Ok(Value::from("pong")))]
///   }
/// }
/// ```
pub trait Exposable: Sized + 'static {
  fn methods() -> Vec<Method<Self>>;
}

type Invoke = Box<dyn Fn(Vec<Value>) -> Option<Result<Value, ScriptError>>>;

/// A type-erased exposed method. The bridge boxes these and hands V8 a raw
/// pointer to them, so they must not move while the bridge is alive.
pub(crate) struct NativeMethod {
  pub(crate) object: String,
  pub(crate) name: &'static str,
  pub(crate) arity: usize,
  pub(crate) limits: ConversionLimits,
  invoke: Invoke,
}

impl NativeMethod {
  pub(crate) fn new<T: Exposable>(
    object_name: &str,
    script_name: &'static str,
    method: Method<T>,
    target: Weak<T>,
    limits: ConversionLimits,
  ) -> Self {
    let handler = method.handler;
    Self {
      object: object_name.to_string(),
      name: script_name,
      arity: method.arity,
      limits,
      invoke: Box::new(move |args| {
        let this: Rc<T> = target.upgrade()?;
        Some(handler(&this, args))
      }),
    }
  }

  /// Calls the handler, or fails with `Lifetime` if the target was dropped.
  pub(crate) fn invoke(&self, args: Vec<Value>) -> Result<Value, ScriptError> {
    match (self.invoke)(args) {
      Some(result) => result,
      None => {
        log::warn!(
          "{}.{} called after its native object was dropped",
          self.object,
          self.name
        );
        Err(ScriptError::Lifetime {
          object: self.object.clone(),
          method: self.name.to_string(),
        })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  struct Counter(std::cell::Cell<u32>);

  impl Exposable for Counter {
    fn methods() -> Vec<Method<Self>> {
      vec![
        Method::new("js_bump", 0, |this: &Counter, _| {
          this.0.set(this.0.get() + 1);
          Ok(Value::from(this.0.get()))
        }),
        Method::new("bump", 0, |_, _| Ok(Value::Null)),
        Method::new("js_", 0, |_, _| Ok(Value::Null)),
      ]
    }
  }

  #[test]
  fn only_prefixed_names_are_exposed() {
    let names = Counter::methods()
      .iter()
      .map(Method::script_name)
      .collect::<Vec<_>>();
    assert_eq!(names, vec![Some("bump"), None, None]);
  }

  #[test]
  fn dropped_target_is_a_lifetime_error() {
    let counter = Rc::new(Counter(Default::default()));
    let method = Counter::methods()[0];
    let native = NativeMethod::new(
      "counter",
      "bump",
      method,
      Rc::downgrade(&counter),
      Default::default(),
    );
    assert_eq!(native.invoke(vec![]).unwrap(), Value::from(1));
    drop(counter);
    let err = native.invoke(vec![]).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Lifetime);
    assert_eq!(
      err.to_string(),
      "counter.bump was called after its native object was dropped"
    );
  }
}
