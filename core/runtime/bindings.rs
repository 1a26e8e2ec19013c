// Copyright 2018-2025 the Deno authors. MIT license.

use super::exception_state::ExceptionState;
use crate::convert::ToV8;
use crate::convert::from_v8_with_limits;
use crate::error::ScriptError;
use crate::exposable::NativeMethod;
use std::os::raw::c_void;

pub(crate) fn script_origin<'a>(
  s: &mut v8::HandleScope<'a>,
  resource_name: v8::Local<'a, v8::String>,
) -> v8::ScriptOrigin<'a> {
  let source_map_url = v8::String::empty(s);
  v8::ScriptOrigin::new(
    s,
    resource_name.into(),
    0,
    0,
    false,
    123,
    Some(source_map_url.into()),
    true,
    false,
    false,
    None,
  )
}

/// Builds the script-side function for an exposed native method. V8 keeps a
/// raw pointer to `method`, so it must stay boxed in place for as long as the
/// context lives.
pub(crate) fn native_method_function<'s>(
  scope: &mut v8::HandleScope<'s>,
  method: &NativeMethod,
  v8name: v8::Local<v8::String>,
) -> Option<v8::Local<'s, v8::Function>> {
  let method_ptr = method as *const NativeMethod as *const c_void;
  let external = v8::External::new(scope, method_ptr as *mut c_void);

  let function = v8::Function::builder(native_method_callback)
    .data(external.into())
    .length(method.arity as i32)
    .build(scope)?;
  function.set_name(v8name);
  Some(function)
}

fn native_method_callback(
  scope: &mut v8::HandleScope,
  args: v8::FunctionCallbackArguments,
  mut rv: v8::ReturnValue,
) {
  let Ok(data) = v8::Local::<v8::External>::try_from(args.data()) else {
    return;
  };
  // SAFETY: the external was created by `native_method_function` from a
  // `NativeMethod` owned by the bridge, which outlives its context.
  let method = unsafe { &*(data.value() as *const NativeMethod) };
  log::trace!("dispatching {}.{}", method.object, method.name);

  match dispatch(scope, &args, method) {
    Ok(value) => rv.set(value),
    Err(error) => throw_native_error(scope, error),
  }
}

fn dispatch<'s>(
  scope: &mut v8::HandleScope<'s>,
  args: &v8::FunctionCallbackArguments,
  method: &NativeMethod,
) -> Result<v8::Local<'s, v8::Value>, ScriptError> {
  let mut arguments = Vec::with_capacity(method.arity);
  for index in 0..method.arity {
    let arg = args.get(index as i32);
    arguments.push(from_v8_with_limits(scope, arg, method.limits)?);
  }
  let result = method.invoke(arguments)?;
  Ok(result.to_v8(scope)?)
}

fn throw_native_error(scope: &mut v8::HandleScope, error: ScriptError) {
  let exception = error.to_v8_exception(scope);
  let state = ExceptionState::from_isolate(scope);
  state.set_native_error(v8::Global::new(scope, exception), error);
  scope.throw_exception(exception);
}
