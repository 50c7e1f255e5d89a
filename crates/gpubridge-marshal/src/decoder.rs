//! Reading typed values back out of native byte layouts.
//!
//! The binary conventions live in [`NativeScalar`], which the encoder uses
//! for writing as well, so both directions agree on widths and byte order by
//! construction.

use crate::{DecodeError, FieldValues, NativeAddress, Value};
use gpubridge_layout::{FieldType, PrimitiveKind, StructLayout};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::slice;

/// String-view length meaning "NUL-terminated, length unknown".
pub const STRLEN: usize = usize::MAX;

/// A Rust scalar with a fixed native encoding.
pub trait NativeScalar: Sized + Copy {
    const KIND: PrimitiveKind;

    /// Decodes from exactly `KIND.size()` little-endian bytes.
    fn from_le(bytes: &[u8]) -> Self;

    /// Encodes into exactly `KIND.size()` little-endian bytes.
    fn write_le(self, out: &mut [u8]);
}

macro_rules! impl_native_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl NativeScalar for $ty {
                const KIND: PrimitiveKind = PrimitiveKind::$kind;

                fn from_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }

                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_native_scalar! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

impl NativeScalar for usize {
    const KIND: PrimitiveKind = PrimitiveKind::Size;

    fn from_le(bytes: &[u8]) -> Self {
        <u64 as NativeScalar>::from_le(bytes) as usize
    }

    fn write_le(self, out: &mut [u8]) {
        (self as u64).write_le(out)
    }
}

impl NativeScalar for NativeAddress {
    const KIND: PrimitiveKind = PrimitiveKind::Pointer;

    fn from_le(bytes: &[u8]) -> Self {
        NativeAddress::new(<u64 as NativeScalar>::from_le(bytes) as usize)
    }

    fn write_le(self, out: &mut [u8]) {
        (self.get() as u64).write_le(out)
    }
}

impl NativeScalar for bool {
    const KIND: PrimitiveKind = PrimitiveKind::Bool;

    fn from_le(bytes: &[u8]) -> Self {
        <u32 as NativeScalar>::from_le(bytes) != 0
    }

    fn write_le(self, out: &mut [u8]) {
        (self as u32).write_le(out)
    }
}

fn span(bytes: &[u8], offset: usize, size: usize) -> Result<&[u8], DecodeError> {
    offset
        .checked_add(size)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(DecodeError::OutOfBounds {
            offset,
            size,
            len: bytes.len(),
        })
}

/// Reads one scalar at `offset`.
pub fn read<T: NativeScalar>(bytes: &[u8], offset: usize) -> Result<T, DecodeError> {
    span(bytes, offset, T::KIND.size()).map(T::from_le)
}

/// Reads one scalar of a dynamically chosen kind.
pub fn read_value(kind: PrimitiveKind, bytes: &[u8], offset: usize) -> Result<Value, DecodeError> {
    Ok(match kind {
        PrimitiveKind::U8 => Value::U8(read(bytes, offset)?),
        PrimitiveKind::I8 => Value::I8(read(bytes, offset)?),
        PrimitiveKind::U16 => Value::U16(read(bytes, offset)?),
        PrimitiveKind::I16 => Value::I16(read(bytes, offset)?),
        PrimitiveKind::U32 => Value::U32(read(bytes, offset)?),
        PrimitiveKind::I32 => Value::I32(read(bytes, offset)?),
        PrimitiveKind::U64 => Value::U64(read(bytes, offset)?),
        PrimitiveKind::I64 => Value::I64(read(bytes, offset)?),
        PrimitiveKind::F32 => Value::F32(read(bytes, offset)?),
        PrimitiveKind::F64 => Value::F64(read(bytes, offset)?),
        PrimitiveKind::Pointer => Value::Pointer(read(bytes, offset)?),
        PrimitiveKind::Size => Value::Size(read(bytes, offset)?),
        PrimitiveKind::Bool => Value::Bool(read(bytes, offset)?),
    })
}

fn decode_field(ty: &FieldType, bytes: &[u8], offset: usize) -> Result<Value, DecodeError> {
    match ty {
        FieldType::Primitive(kind) => read_value(*kind, bytes, offset),
        FieldType::Struct(inner) => {
            let inner_bytes = span(bytes, offset, inner.size())?;
            decode_struct(inner, inner_bytes).map(Value::Struct)
        }
        FieldType::Array { element, count } => (0..*count)
            .map(|i| read_value(*element, bytes, offset + i * element.size()))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
    }
}

/// Decodes every field of `layout` from the start of `bytes`.
pub fn decode_struct(layout: &StructLayout, bytes: &[u8]) -> Result<FieldValues, DecodeError> {
    span(bytes, 0, layout.size())?;
    layout
        .fields()
        .iter()
        .map(|field| decode_field(field.ty(), bytes, field.offset()).map(|value| (field.name(), value)))
        .collect()
}

/// A bounded view over memory the native side owns.
///
/// Reads are bounds-checked against the length the view was created with;
/// the view never outlives the call that produced the memory.
#[derive(Debug, Clone, Copy)]
pub struct NativeView<'a> {
    bytes: &'a [u8],
}

impl<'a> NativeView<'a> {
    /// Wraps `len` bytes at `addr`.
    ///
    /// # Safety
    /// `addr` must point to `len` readable bytes that stay valid and unmodified
    /// for `'a`.
    pub unsafe fn from_raw(addr: NativeAddress, len: usize) -> Result<Self, DecodeError> {
        if len == 0 {
            return Ok(NativeView { bytes: &[] });
        }
        if addr.is_null() {
            return Err(DecodeError::NullPointer { what: "native result memory" });
        }
        Ok(NativeView {
            bytes: slice::from_raw_parts(addr.as_ptr::<u8>(), len),
        })
    }

    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        NativeView { bytes }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn read<T: NativeScalar>(&self, offset: usize) -> Result<T, DecodeError> {
        read(self.bytes, offset)
    }

    pub fn decode_struct(&self, layout: &StructLayout) -> Result<FieldValues, DecodeError> {
        decode_struct(layout, self.bytes)
    }
}

/// Copies out the text of a string view given as its `(data, length)` pair.
///
/// `Ok(None)` means the native side supplied no string at all (null data with
/// zero length). A length of [`STRLEN`] means the data is NUL-terminated.
///
/// # Safety
/// `data` must point to `length` readable bytes, or to a NUL-terminated string
/// when `length == STRLEN`.
pub unsafe fn string_from_view(data: NativeAddress, length: usize) -> Result<Option<String>, DecodeError> {
    if data.is_null() {
        return if length == 0 || length == STRLEN {
            Ok(None)
        } else {
            Err(DecodeError::NullPointer { what: "string view data" })
        };
    }
    if length == STRLEN {
        return read_c_string(data).map(Some);
    }
    if length > isize::MAX as usize {
        return Err(DecodeError::LengthOverflow { count: length, stride: 1 });
    }
    let bytes = slice::from_raw_parts(data.as_ptr::<u8>(), length);
    std::str::from_utf8(bytes)
        .map(|text| Some(text.to_owned()))
        .map_err(|_| DecodeError::InvalidUtf8)
}

/// Reads a 16-byte string-view descriptor at `addr` and copies out its text.
///
/// # Safety
/// `addr` must point to a readable string-view descriptor whose data pointer
/// satisfies [`string_from_view`].
pub unsafe fn read_string_view(addr: NativeAddress) -> Result<Option<String>, DecodeError> {
    let view = NativeView::from_raw(addr, 16)?;
    let data: NativeAddress = view.read(0)?;
    let length: usize = view.read(8)?;
    string_from_view(data, length)
}

/// Copies out a NUL-terminated string.
///
/// # Safety
/// `addr` must be null or point to a NUL-terminated string.
pub unsafe fn read_c_string(addr: NativeAddress) -> Result<String, DecodeError> {
    if addr.is_null() {
        return Err(DecodeError::NullPointer { what: "C string" });
    }
    CStr::from_ptr(addr.as_ptr::<c_char>())
        .to_str()
        .map(str::to_owned)
        .map_err(|_| DecodeError::InvalidUtf8)
}

/// Decodes a native array of `count` records laid out at stride `layout.size()`.
///
/// # Safety
/// `addr` must point to `count * layout.size()` readable bytes.
pub unsafe fn read_struct_array(
    addr: NativeAddress,
    count: usize,
    layout: &StructLayout,
) -> Result<Vec<FieldValues>, DecodeError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let stride = layout.size();
    if stride == 0 {
        // Zero-sized records occupy no memory; there is nothing to read.
        return (0..count).map(|_| decode_struct(layout, &[])).collect();
    }
    let total = count
        .checked_mul(stride)
        .ok_or(DecodeError::LengthOverflow { count, stride })?;
    let view = NativeView::from_raw(addr, total)?;
    view.bytes()
        .chunks_exact(stride)
        .map(|record| decode_struct(layout, record))
        .collect()
}
