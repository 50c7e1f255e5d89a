use crate::{CallbackKind, CallbackToken};
use gpubridge_marshal::{DecodeError, EncodeError};
use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while waiting on a native async operation.
#[derive(Error, Debug, Diagnostic)]
pub enum BridgeError {
    /// The native side reported failure. Displays exactly the native message.
    #[error("{message}")]
    #[diagnostic(code(gpubridge_bridge::rejected))]
    Rejected {
        kind: CallbackKind,
        status: u32,
        message: String,
    },

    #[error("{token} did not complete within {iterations} poll iterations")]
    #[diagnostic(code(gpubridge_bridge::timeout))]
    Timeout { token: CallbackToken, iterations: u32 },

    #[error("Callback bridge shut down before the operation completed")]
    #[diagnostic(code(gpubridge_bridge::shutdown))]
    Shutdown,

    #[error("Failed to encode callback info: {0}")]
    #[diagnostic(code(gpubridge_bridge::encode))]
    Encode(#[from] EncodeError),

    #[error("Failed to decode callback payload: {0}")]
    #[diagnostic(code(gpubridge_bridge::decode))]
    Decode(#[from] DecodeError),

    #[error("Invalid bridge configuration: {0}")]
    #[diagnostic(code(gpubridge_bridge::config))]
    Config(#[from] toml::de::Error),
}
