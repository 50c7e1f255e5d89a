use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while binding to or calling into the native library.
#[derive(Error, Debug, Diagnostic)]
pub enum CallError {
    #[error("Native library is missing {} symbols: {}", .missing.len(), .missing.join(", "))]
    #[diagnostic(code(gpubridge_native::missing_symbols))]
    MissingSymbols { missing: Vec<&'static str> },

    #[error("No native signature is declared for `{0}`")]
    #[diagnostic(code(gpubridge_native::unknown_symbol))]
    UnknownSymbol(String),

    #[error("Binding for `{symbol}` has signature {found}, but the library declares {expected}")]
    #[diagnostic(code(gpubridge_native::signature_mismatch))]
    SignatureMismatch {
        symbol: &'static str,
        expected: String,
        found: String,
    },

    #[error("`{symbol}` returned a null handle")]
    #[diagnostic(code(gpubridge_native::null_handle))]
    NullHandle { symbol: &'static str },
}
