// Copyright 2018-2025 the Deno authors. MIT license.
use crate::ConversionError;
use crate::Exposable;
use crate::Method;
use crate::ScriptError;
use crate::Value;
use std::cell::Cell;

mod error;

#[derive(Default)]
pub(crate) struct Pinger {
  pub(crate) pings: Cell<u32>,
}

impl Exposable for Pinger {
  fn methods() -> Vec<Method<Self>> {
    vec![
      Method::new("js_ping", 0, |this: &Pinger, _| {
        this.pings.set(this.pings.get() + 1);
        Ok(Value::from("pong"))
      }),
      Method::new("js_echo", 1, |_, mut args| Ok(args.remove(0))),
      Method::new("js_add", 2, |_, args| {
        let mut sum = 0.0;
        for arg in args {
          sum += f64::try_from(arg)?;
        }
        Ok(Value::from(sum))
      }),
      Method::new("js_fail", 0, |_, _| {
        Err(ScriptError::Conversion(ConversionError::Unexpected {
          expected: "nothing",
          found: "a call",
        }))
      }),
      Method::new("helper", 0, |_, _| Ok(Value::Null)),
    ]
  }
}
