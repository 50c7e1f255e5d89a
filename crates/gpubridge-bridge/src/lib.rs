//! Native completion callbacks as futures.
//!
//! Async native entry points take a callback-info descriptor. The
//! [`CallbackBridge`] builds those descriptors, points them at `extern "C"`
//! trampolines, and hands back a [`PendingOperation`] that resolves when the
//! trampoline fires. Callbacks only fire while the native event pump runs, so
//! [`CallbackBridge::wait`] keeps pumping until the operation completes or
//! its poll budget is spent.

mod bridge;
mod config;
mod error;
mod kind;
mod payload;
mod token;
mod trampoline;

pub use bridge::{CallbackBridge, PendingOperation};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use gpubridge_native::EventPump;
pub use kind::CallbackKind;
pub use payload::{decode_compilation_info, CallbackPayload, CompilationMessage};
pub use token::{BridgeId, CallbackToken};
pub use trampoline::{live_routes, trampoline_for};
