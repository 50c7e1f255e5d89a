use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while serializing values into native buffers.
///
/// All of these indicate that the caller built a value map that disagrees
/// with the struct it targets; nothing is written past the failing field.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Field `{field}` expects {expected}, got {found}")]
    #[diagnostic(code(gpubridge_marshal::type_mismatch))]
    TypeMismatch {
        field: String,
        expected: String,
        found: &'static str,
    },

    #[error("Struct {layout} has no field `{field}`")]
    #[diagnostic(code(gpubridge_marshal::unknown_field))]
    UnknownField { layout: String, field: String },

    #[error("String passed as a C string contains an interior NUL byte at {position}")]
    #[diagnostic(code(gpubridge_marshal::interior_nul))]
    InteriorNul { position: usize },

    #[error("Invalid native allocation of {size} bytes aligned to {align}")]
    #[diagnostic(code(gpubridge_marshal::allocation))]
    InvalidAllocation { size: usize, align: usize },
}

/// Errors raised while reading values back out of native memory.
///
/// A decode error means the result structure could not be read completely;
/// callers never receive partially-decoded data.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Read of {size} bytes at offset {offset} is out of bounds for a {len}-byte buffer")]
    #[diagnostic(code(gpubridge_marshal::out_of_bounds))]
    OutOfBounds { offset: usize, size: usize, len: usize },

    #[error("Null pointer where {what} was expected")]
    #[diagnostic(code(gpubridge_marshal::null_pointer))]
    NullPointer { what: &'static str },

    #[error("Native string is not valid UTF-8")]
    #[diagnostic(code(gpubridge_marshal::invalid_utf8))]
    InvalidUtf8,

    #[error("Native length {count} x {stride} overflows the address space")]
    #[diagnostic(code(gpubridge_marshal::length_overflow))]
    LengthOverflow { count: usize, stride: usize },

    #[error("Field `{field}` is missing or has the wrong type")]
    #[diagnostic(code(gpubridge_marshal::missing_field))]
    MissingField { field: String },
}
