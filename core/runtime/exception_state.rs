// Copyright 2018-2025 the Deno authors. MIT license.
use crate::error::ScriptError;
use std::cell::RefCell;
use std::rc::Rc;

/// Remembers the error of the last native method that failed, together with
/// the exception it was thrown into the script as. If that same exception
/// escapes the script, the bridge reports the native error instead of a
/// generic execution error.
#[derive(Default)]
pub(crate) struct ExceptionState {
  native_error: RefCell<Option<(v8::Global<v8::Value>, ScriptError)>>,
}

impl ExceptionState {
  pub(crate) fn from_isolate(isolate: &v8::Isolate) -> Rc<Self> {
    isolate.get_slot::<Rc<Self>>().cloned().unwrap_or_default()
  }

  pub(crate) fn destroy(&self) {
    self.clear_error();
  }

  pub(crate) fn clear_error(&self) {
    self.native_error.borrow_mut().take();
  }

  pub(crate) fn set_native_error(
    &self,
    exception: v8::Global<v8::Value>,
    error: ScriptError,
  ) {
    *self.native_error.borrow_mut() = Some((exception, error));
  }

  /// Takes the stored native error if `exception` is the value it was
  /// thrown as.
  pub(crate) fn take_native_error(
    &self,
    scope: &mut v8::HandleScope,
    exception: v8::Local<v8::Value>,
  ) -> Option<ScriptError> {
    let (thrown, error) = self.native_error.borrow_mut().take()?;
    let thrown = v8::Local::new(scope, thrown);
    thrown.strict_equals(exception).then_some(error)
  }
}
