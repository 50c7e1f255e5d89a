//! Marshalling between Rust values and native struct memory.
//!
//! [`StructEncoder`] turns [`FieldValues`] into zeroed, aligned native buffers
//! laid out by `gpubridge-layout`, and owns them until the native call that
//! reads them is over. The [`decoder`] functions go the other way for result
//! structures and native-owned strings. [`PinnedAllocations`] covers memory
//! that must outlive a call because a native object keeps pointing into it.

mod address;
mod alloc;
pub mod decoder;
mod encoder;
mod error;
mod pinned;
mod value;

pub use address::NativeAddress;
pub use alloc::EncodedBuffer;
pub use decoder::{
    decode_struct, read, read_c_string, read_string_view, read_struct_array, read_value, string_from_view,
    NativeScalar, NativeView, STRLEN,
};
pub use encoder::{encode_to_buffer, StringViewRef, StructEncoder, STRING_VIEW_LAYOUT};
pub use error::{DecodeError, EncodeError};
pub use pinned::PinnedAllocations;
pub use value::{FieldValues, Value};
