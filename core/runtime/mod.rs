// Copyright 2018-2025 the Deno authors. MIT license.
pub(crate) mod bindings;
mod bridge;
pub(crate) mod exception_state;
mod setup;

#[cfg(test)]
mod tests;

pub use bridge::BridgeOptions;
pub use bridge::ScriptBridge;
