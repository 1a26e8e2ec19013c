// Copyright 2018-2025 the Deno authors. MIT license.

use super::bindings;
use super::exception_state::ExceptionState;
use super::setup;
use crate::convert::ConversionLimits;
use crate::convert::DEFAULT_MAX_DEPTH;
use crate::convert::DEFAULT_MAX_LENGTH;
use crate::convert::ToV8;
use crate::convert::from_v8_with_limits;
use crate::convert::v8_string;
use crate::error::JsException;
use crate::error::LookupFailure;
use crate::error::ScriptError;
use crate::exposable::Exposable;
use crate::exposable::NativeMethod;
use crate::values::Value;
use indexmap::IndexSet;
use log::debug;
use std::rc::Rc;

/// Options for creating a [`ScriptBridge`].
#[derive(Debug, Clone)]
pub struct BridgeOptions {
  /// Resource name given to scripts run with [`ScriptBridge::evaluate`]. It
  /// shows up in stack traces and in [`JsException::resource_name`].
  pub script_name: String,

  /// How deeply arrays and objects may nest when converting script values
  /// to [`Value`]. Deeper (or cyclic) values fail with a conversion error.
  pub max_conversion_depth: usize,

  /// Largest array length, or own property count of an object, accepted
  /// when converting script values. Larger values fail with a conversion
  /// error before anything is allocated for them.
  pub max_conversion_length: usize,

  /// Extra V8 flags, e.g. `--stack-size=2000`. V8 is initialized once per
  /// process, so only the flags of the first bridge created take effect.
  pub v8_flags: Vec<String>,
}

impl Default for BridgeOptions {
  fn default() -> Self {
    Self {
      script_name: "<anonymous>".to_string(),
      max_conversion_depth: DEFAULT_MAX_DEPTH,
      max_conversion_length: DEFAULT_MAX_LENGTH,
      v8_flags: vec![],
    }
  }
}

/// A JavaScript context with a native bridge.
///
/// The bridge exclusively owns a V8 isolate and one context inside it. Every
/// operation runs synchronously on the calling thread; the type is neither
/// `Send` nor `Sync`. When several bridges live on one thread they must be
/// dropped in the reverse order of their creation.
pub struct ScriptBridge {
  // Fields drop in declaration order: the context handle has to go before
  // the isolate that owns it.
  context: v8::Global<v8::Context>,
  installed: IndexSet<String>,
  methods: Vec<Box<NativeMethod>>,
  options: BridgeOptions,
  isolate: v8::OwnedIsolate,
}

impl Drop for ScriptBridge {
  fn drop(&mut self) {
    ExceptionState::from_isolate(&self.isolate).destroy();
  }
}

impl BridgeOptions {
  pub(crate) fn conversion_limits(&self) -> ConversionLimits {
    ConversionLimits {
      max_depth: self.max_conversion_depth,
      max_length: self.max_conversion_length,
    }
  }
}

impl Default for ScriptBridge {
  fn default() -> Self {
    Self::new()
  }
}

impl ScriptBridge {
  pub fn new() -> Self {
    Self::with_options(Default::default())
  }

  pub fn with_options(options: BridgeOptions) -> Self {
    setup::init_v8(&options.v8_flags);
    let mut isolate = setup::create_isolate();
    isolate.set_slot(Rc::new(ExceptionState::default()));

    let context = {
      let scope = &mut v8::HandleScope::new(&mut isolate);
      let context = v8::Context::new(scope, Default::default());
      v8::Global::new(scope, context)
    };

    Self {
      context,
      installed: IndexSet::new(),
      methods: vec![],
      options,
      isolate,
    }
  }

  pub fn options(&self) -> &BridgeOptions {
    &self.options
  }

  /// Names installed with [`ScriptBridge::install`], in installation order.
  pub fn installed(&self) -> impl Iterator<Item = &str> {
    self.installed.iter().map(String::as_str)
  }

  /// Returns a handle scope entered into the bridge's context, for working
  /// with V8 values directly.
  pub fn handle_scope(&mut self) -> v8::HandleScope<'_> {
    v8::HandleScope::with_context(&mut self.isolate, &self.context)
  }

  /// Compiles and runs `script`, returning its completion value.
  ///
  /// ```
  /// # use script_bridge::ScriptBridge;
  /// # use script_bridge::Value;
  /// let mut bridge = ScriptBridge::new();
  /// assert_eq!(bridge.evaluate("1 + 2").unwrap(), Value::from(3));
  /// ```
  pub fn evaluate(&mut self, script: &str) -> Result<Value, ScriptError> {
    let name = self.options.script_name.clone();
    self.evaluate_named(&name, script)
  }

  /// Like [`ScriptBridge::evaluate`], with `name` as the script's resource
  /// name.
  pub fn evaluate_named(
    &mut self,
    name: &str,
    script: &str,
  ) -> Result<Value, ScriptError> {
    debug!("evaluating {name} ({} bytes)", script.len());
    let limits = self.options.conversion_limits();
    let scope =
      &mut v8::HandleScope::with_context(&mut self.isolate, &self.context);
    ExceptionState::from_isolate(scope).clear_error();

    let source = v8_string(scope, script)?;
    let name = v8_string(scope, name)?;
    let origin = bindings::script_origin(scope, name);

    let tc_scope = &mut v8::TryCatch::new(scope);

    let script = match v8::Script::compile(tc_scope, source, Some(&origin)) {
      Some(script) => script,
      None => {
        let exception = caught_exception(tc_scope, limits);
        return Err(ScriptError::Compile(exception));
      }
    };

    match script.run(tc_scope) {
      Some(value) => Ok(from_v8_with_limits(tc_scope, value, limits)?),
      None => Err(execution_error(tc_scope, limits)),
    }
  }

  /// Calls the global function `name` with `arguments`.
  pub fn call(
    &mut self,
    name: &str,
    arguments: &[Value],
  ) -> Result<Value, ScriptError> {
    debug!("calling {name} with {} argument(s)", arguments.len());
    let limits = self.options.conversion_limits();
    let scope =
      &mut v8::HandleScope::with_context(&mut self.isolate, &self.context);
    ExceptionState::from_isolate(scope).clear_error();

    let global = scope.get_current_context().global(scope);
    let key = v8_string(scope, name)?;

    let tc_scope = &mut v8::TryCatch::new(scope);

    let Some(value) = global.get(tc_scope, key.into()) else {
      return Err(execution_error(tc_scope, limits));
    };
    if value.is_undefined() {
      return Err(ScriptError::lookup(name, LookupFailure::NotDefined));
    }
    let Ok(function) = v8::Local::<v8::Function>::try_from(value) else {
      return Err(ScriptError::lookup(name, LookupFailure::NotCallable));
    };

    let args = arguments
      .iter()
      .map(|arg| arg.to_v8(tc_scope))
      .collect::<Result<Vec<_>, _>>()?;
    let this = v8::undefined(tc_scope).into();

    match function.call(tc_scope, this, &args) {
      Some(value) => Ok(from_v8_with_limits(tc_scope, value, limits)?),
      None => Err(execution_error(tc_scope, limits)),
    }
  }

  /// Binds a new script object under the global `name` whose functions
  /// forward to the `js_`-prefixed methods of `T`.
  ///
  /// The bridge only keeps a weak reference to `object`. Once the caller
  /// drops it, script calls into the object fail with
  /// [`ErrorKind::Lifetime`](crate::ErrorKind::Lifetime). Installing under a
  /// name that is already bound replaces the binding. If the global cannot
  /// be assigned (a throwing setter, a frozen binding), nothing is recorded
  /// and the failure is returned as an execution error.
  pub fn install<T: Exposable>(
    &mut self,
    object: &Rc<T>,
    name: &str,
  ) -> Result<(), ScriptError> {
    let limits = self.options.conversion_limits();
    let native_methods = T::methods()
      .into_iter()
      .filter_map(|method| {
        let script_name = method.script_name()?;
        Some(Box::new(NativeMethod::new(
          name,
          script_name,
          method,
          Rc::downgrade(object),
          limits,
        )))
      })
      .collect::<Vec<_>>();
    debug!(
      "installing {name} with methods {:?}",
      native_methods.iter().map(|m| m.name).collect::<Vec<_>>()
    );

    // Functions already handed out keep pointing at their slots, so slots
    // are never freed before the bridge, even when `name` is reinstalled.
    let first = self.methods.len();
    self.methods.extend(native_methods);

    let scope =
      &mut v8::HandleScope::with_context(&mut self.isolate, &self.context);
    ExceptionState::from_isolate(scope).clear_error();
    let tc_scope = &mut v8::TryCatch::new(scope);

    let target = v8::Object::new(tc_scope);
    for method in &self.methods[first..] {
      let key = v8_string(tc_scope, method.name)?;
      let Some(function) =
        bindings::native_method_function(tc_scope, method, key)
      else {
        return Err(execution_error(tc_scope, limits));
      };
      if target.create_data_property(tc_scope, key.into(), function.into())
        != Some(true)
      {
        return Err(binding_error(tc_scope, method.name, limits));
      }
    }

    let global = tc_scope.get_current_context().global(tc_scope);
    let key = v8_string(tc_scope, name)?;
    if global.set(tc_scope, key.into(), target.into()) != Some(true) {
      return Err(binding_error(tc_scope, name, limits));
    }
    // Sloppy-mode assignment to a read-only global reports success.
    let bound = global.get(tc_scope, key.into());
    if !bound.is_some_and(|bound| bound.strict_equals(target.into())) {
      return Err(binding_error(tc_scope, name, limits));
    }

    self.installed.insert(name.to_string());
    Ok(())
  }
}

fn caught_exception(
  tc_scope: &mut v8::TryCatch<v8::HandleScope>,
  limits: ConversionLimits,
) -> JsException {
  match tc_scope.exception() {
    Some(exception) => {
      JsException::from_v8_exception(tc_scope, exception, limits)
    }
    None => JsException::terminated(),
  }
}

fn execution_error(
  tc_scope: &mut v8::TryCatch<v8::HandleScope>,
  limits: ConversionLimits,
) -> ScriptError {
  let Some(exception) = tc_scope.exception() else {
    return ScriptError::Execution(JsException::terminated());
  };
  let js_exception =
    JsException::from_v8_exception(tc_scope, exception, limits);
  match ExceptionState::from_isolate(tc_scope)
    .take_native_error(tc_scope, exception)
  {
    Some(error) => ScriptError::Native {
      error: Box::new(error),
      exception: js_exception,
    },
    None => ScriptError::Execution(js_exception),
  }
}

fn binding_error(
  tc_scope: &mut v8::TryCatch<v8::HandleScope>,
  name: &str,
  limits: ConversionLimits,
) -> ScriptError {
  if tc_scope.has_caught() {
    return execution_error(tc_scope, limits);
  }
  ScriptError::Execution(JsException::uncaught_error(&format!(
    "Cannot assign to '{name}'"
  )))
}
