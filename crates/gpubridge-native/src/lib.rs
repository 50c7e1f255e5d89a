//! The native call surface.
//!
//! A static table declares every entry point the core calls. At startup the
//! table is bound against a [`SymbolResolver`], and typed function pointers
//! are only handed out after their Rust signature has been checked against
//! the table. The [`abi`] module carries the header structures and constants
//! the marshalling layers need.

pub mod abi;
mod bind;
mod error;
mod pump;
mod signature;

pub use bind::{check_handle, NativeBool, NativeFn, NativeLibrary, NativeReturn, NativeType, SymbolResolver};
pub use error::CallError;
pub use pump::{EventPump, NativeEventPump};
pub use signature::{describe, signature, NativeSignature, NATIVE_SIGNATURES};
