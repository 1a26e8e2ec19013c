// Copyright 2018-2025 the Deno authors. MIT license.
#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

//! A native bridge to a V8 JavaScript context: evaluate scripts, call
//! script functions and expose Rust objects to script code.
//!
//! ```
//! use script_bridge::Exposable;
//! use script_bridge::Method;
//! use script_bridge::ScriptBridge;
//! use script_bridge::Value;
//! use std::rc::Rc;
//!
//! struct Pinger;
//!
//! impl Exposable for Pinger {
//!   fn methods() -> Vec<Method<Self>> {
//!     vec![Method::new("js_ping", 0, |_, _| Ok(Value::from("pong")))]
//!   }
//! }
//!
//! let mut bridge = ScriptBridge::new();
//! let pinger = Rc::new(Pinger);
//! bridge.install(&pinger, "bridge").unwrap();
//! assert_eq!(bridge.evaluate("bridge.ping()").unwrap(), Value::from("pong"));
//! ```

pub mod convert;
pub mod error;
mod exposable;
mod runtime;
mod values;

// Re-exports
pub use indexmap;
pub use serde_json;
pub use v8;

pub use crate::convert::ConversionLimits;
pub use crate::convert::FromV8;
pub use crate::convert::ToV8;
pub use crate::error::ConversionError;
pub use crate::error::ERROR_DOMAIN;
pub use crate::error::EXCEPTION_KEY;
pub use crate::error::ErrorKind;
pub use crate::error::JsException;
pub use crate::error::ScriptError;
pub use crate::exposable::Exposable;
pub use crate::exposable::Method;
pub use crate::exposable::MethodHandler;
pub use crate::exposable::SCRIPT_METHOD_PREFIX;
pub use crate::runtime::BridgeOptions;
pub use crate::runtime::ScriptBridge;
pub use crate::values::Value;
