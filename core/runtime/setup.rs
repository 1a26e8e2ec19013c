// Copyright 2018-2025 the Deno authors. MIT license.

use std::sync::Once;

fn v8_init(extra_flags: &[String]) {
  #[cfg(feature = "include_icu_data")]
  {
    v8::icu::set_common_data_74(deno_core_icudata::ICU_DATA).unwrap();
  }

  let base_flags = " --no-validate-asm";
  let flags = if extra_flags.is_empty() {
    base_flags.to_string()
  } else {
    format!("{base_flags} {}", extra_flags.join(" "))
  };
  log::debug!("initializing V8 with flags:{flags}");
  v8::V8::set_flags_from_string(&flags);

  let v8_platform = if cfg!(test) {
    // We want to use the unprotected platform for unit tests
    v8::new_unprotected_default_platform(0, false)
  } else {
    v8::new_default_platform(0, false)
  }
  .make_shared();
  v8::V8::initialize_platform(v8_platform);
  v8::V8::initialize();
}

/// Initializes V8 once per process. Flags passed by later callers are
/// ignored.
pub(crate) fn init_v8(extra_flags: &[String]) {
  static SCRIPT_BRIDGE_INIT: Once = Once::new();

  SCRIPT_BRIDGE_INIT.call_once(|| v8_init(extra_flags));
}

pub(crate) fn create_isolate() -> v8::OwnedIsolate {
  let mut isolate = v8::Isolate::new(v8::CreateParams::default());
  isolate.set_capture_stack_trace_for_uncaught_exceptions(true, 10);
  isolate
}
