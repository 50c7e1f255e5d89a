use crate::decoder::NativeScalar;
use crate::{EncodeError, EncodedBuffer, FieldValues, NativeAddress, Value};
use gpubridge_layout::{compute_layout, FieldType, PrimitiveKind, StructLayout};
use once_cell::sync::Lazy;

/// Layout of the native string view: `{ const char* data; size_t length; }`.
pub static STRING_VIEW_LAYOUT: Lazy<StructLayout> = Lazy::new(|| {
    compute_layout("StringView", [("data", FieldType::POINTER), ("length", FieldType::SIZE)])
        .expect("string view layout is statically valid")
});

/// Addresses produced by [`StructEncoder::encode_string`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringViewRef {
    /// First byte of the text, or null for an empty string.
    pub data: NativeAddress,
    /// Length in bytes, without any terminator.
    pub length: usize,
    /// Address of the 16-byte `{data, length}` descriptor.
    pub descriptor: NativeAddress,
}

/// Serializes value maps into native struct buffers and keeps every buffer it
/// creates alive until [`release_all`](StructEncoder::release_all).
///
/// An encoder is scoped to one native call (or one group of calls). Every
/// address it hands out points into memory this encoder owns, so the encoder
/// must outlive the native call that consumes those addresses.
#[derive(Debug, Default)]
pub struct StructEncoder {
    retained: Vec<EncodedBuffer>,
}

impl StructEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn retain(&mut self, buffer: EncodedBuffer) -> NativeAddress {
        let addr = buffer.address();
        self.retained.push(buffer);
        addr
    }

    /// Encodes `values` according to `layout` into a fresh zeroed buffer and
    /// returns its address. Fields missing from `values` stay zero.
    pub fn encode(&mut self, layout: &StructLayout, values: &FieldValues) -> Result<NativeAddress, EncodeError> {
        let buffer = encode_to_buffer(layout, values)?;
        log::trace!("encoded {} ({} bytes) at {}", layout.name(), buffer.len(), buffer.address());
        Ok(self.retain(buffer))
    }

    /// Encodes a contiguous array of structs at stride `layout.size()`.
    /// An empty slice yields the null address.
    pub fn encode_array_of_structs(
        &mut self,
        layout: &StructLayout,
        elements: &[FieldValues],
    ) -> Result<NativeAddress, EncodeError> {
        if elements.is_empty() {
            return Ok(NativeAddress::NULL);
        }
        let total = layout
            .size()
            .checked_mul(elements.len())
            .ok_or(EncodeError::InvalidAllocation { size: usize::MAX, align: layout.align() })?;
        let mut buffer = EncodedBuffer::zeroed(total, layout.align())?;
        for (i, values) in elements.iter().enumerate() {
            write_struct(buffer.as_mut_bytes(), i * layout.size(), layout, values)?;
        }
        Ok(self.retain(buffer))
    }

    /// Encodes `text` using the string-view convention: the bytes without a
    /// terminator plus a separate `{data, length}` descriptor.
    pub fn encode_string(&mut self, text: &str) -> Result<StringViewRef, EncodeError> {
        let (data, descriptor, view) = build_string_view(text)?;
        if let Some(data) = data {
            self.retain(data);
        }
        self.retain(descriptor);
        Ok(view)
    }

    /// Encodes `text` as a NUL-terminated C string.
    pub fn encode_cstring(&mut self, text: &str) -> Result<NativeAddress, EncodeError> {
        let buffer = build_cstring(text)?;
        Ok(self.retain(buffer))
    }

    /// Packs handles into a contiguous native pointer array.
    /// An empty slice yields the null address.
    pub fn pointer_array(&mut self, handles: &[NativeAddress]) -> Result<NativeAddress, EncodeError> {
        if handles.is_empty() {
            return Ok(NativeAddress::NULL);
        }
        let stride = PrimitiveKind::Pointer.size();
        let mut buffer = EncodedBuffer::zeroed(handles.len() * stride, PrimitiveKind::Pointer.align())?;
        for (i, handle) in handles.iter().enumerate() {
            handle.write_le(&mut buffer.as_mut_bytes()[i * stride..(i + 1) * stride]);
        }
        Ok(self.retain(buffer))
    }

    /// Packs scalars of one kind into a contiguous native array.
    /// An empty slice yields the null address.
    pub fn primitive_array(&mut self, kind: PrimitiveKind, values: &[Value]) -> Result<NativeAddress, EncodeError> {
        if values.is_empty() {
            return Ok(NativeAddress::NULL);
        }
        let mut buffer = EncodedBuffer::zeroed(values.len() * kind.size(), kind.align())?;
        for (i, value) in values.iter().enumerate() {
            write_primitive(buffer.as_mut_bytes(), i * kind.size(), kind, value, &format!("[{}]", i))?;
        }
        Ok(self.retain(buffer))
    }

    /// Copies raw bytes into a retained buffer (e.g. for buffer uploads).
    pub fn encode_bytes(&mut self, bytes: &[u8], align: usize) -> Result<NativeAddress, EncodeError> {
        let buffer = EncodedBuffer::from_bytes(bytes, align)?;
        Ok(self.retain(buffer))
    }

    /// Looks up a retained buffer by the address this encoder returned.
    pub fn buffer(&self, addr: NativeAddress) -> Option<&EncodedBuffer> {
        self.retained.iter().find(|buffer| buffer.address() == addr && !buffer.is_empty())
    }

    pub fn retained_count(&self) -> usize {
        self.retained.len()
    }

    pub fn retained_bytes(&self) -> usize {
        self.retained.iter().map(EncodedBuffer::len).sum()
    }

    /// Moves every retained buffer out, for callers that must keep them
    /// alive past this encoder (see `PinnedAllocations::adopt`).
    pub fn take_retained(&mut self) -> Vec<EncodedBuffer> {
        std::mem::take(&mut self.retained)
    }

    /// Frees every buffer this encoder created. All addresses it returned
    /// become dangling; only call once the native side is done with them.
    pub fn release_all(&mut self) -> usize {
        let count = self.retained.len();
        if count > 0 {
            log::debug!("releasing {} encoder buffers ({} bytes)", count, self.retained_bytes());
        }
        self.retained.clear();
        count
    }
}

/// Encodes one struct into a standalone buffer without retaining it.
pub fn encode_to_buffer(layout: &StructLayout, values: &FieldValues) -> Result<EncodedBuffer, EncodeError> {
    let mut buffer = EncodedBuffer::zeroed(layout.size(), layout.align())?;
    write_struct(buffer.as_mut_bytes(), 0, layout, values)?;
    Ok(buffer)
}

/// Builds the data buffer (absent for empty text) and descriptor of a
/// string view.
pub(crate) fn build_string_view(
    text: &str,
) -> Result<(Option<EncodedBuffer>, EncodedBuffer, StringViewRef), EncodeError> {
    let data = if text.is_empty() {
        None
    } else {
        Some(EncodedBuffer::from_bytes(text.as_bytes(), 1)?)
    };
    let data_addr = data.as_ref().map(EncodedBuffer::address).unwrap_or(NativeAddress::NULL);

    let values = FieldValues::new()
        .with("data", Value::Pointer(data_addr))
        .with("length", Value::Size(text.len()));
    let descriptor = encode_to_buffer(&STRING_VIEW_LAYOUT, &values)?;
    let view = StringViewRef {
        data: data_addr,
        length: text.len(),
        descriptor: descriptor.address(),
    };
    Ok((data, descriptor, view))
}

pub(crate) fn build_cstring(text: &str) -> Result<EncodedBuffer, EncodeError> {
    if let Some(position) = text.bytes().position(|b| b == 0) {
        return Err(EncodeError::InteriorNul { position });
    }
    let mut buffer = EncodedBuffer::zeroed(text.len() + 1, 1)?;
    buffer.as_mut_bytes()[..text.len()].copy_from_slice(text.as_bytes());
    Ok(buffer)
}

fn write_struct(bytes: &mut [u8], base: usize, layout: &StructLayout, values: &FieldValues) -> Result<(), EncodeError> {
    for (name, value) in values.iter() {
        let field = layout.field(name).ok_or_else(|| EncodeError::UnknownField {
            layout: layout.name().to_string(),
            field: name.to_string(),
        })?;
        let at = base + field.offset();

        match (field.ty(), value) {
            (FieldType::Primitive(kind), _) => write_primitive(bytes, at, *kind, value, name)?,
            (FieldType::Struct(inner), Value::Struct(inner_values)) => write_struct(bytes, at, inner, inner_values)?,
            (FieldType::Array { element, count }, Value::Array(items)) => {
                for (i, item) in items.iter().take(*count).enumerate() {
                    write_primitive(bytes, at + i * element.size(), *element, item, name)?;
                }
            }
            (ty, value) => {
                return Err(EncodeError::TypeMismatch {
                    field: name.to_string(),
                    expected: ty.to_string(),
                    found: value.kind_name(),
                })
            }
        }
    }
    Ok(())
}

fn write_primitive(
    bytes: &mut [u8],
    at: usize,
    kind: PrimitiveKind,
    value: &Value,
    field: &str,
) -> Result<(), EncodeError> {
    let out = &mut bytes[at..at + kind.size()];
    match (kind, value) {
        (PrimitiveKind::U8, Value::U8(v)) => v.write_le(out),
        (PrimitiveKind::I8, Value::I8(v)) => v.write_le(out),
        (PrimitiveKind::U16, Value::U16(v)) => v.write_le(out),
        (PrimitiveKind::I16, Value::I16(v)) => v.write_le(out),
        (PrimitiveKind::U32, Value::U32(v)) => v.write_le(out),
        (PrimitiveKind::I32, Value::I32(v)) => v.write_le(out),
        (PrimitiveKind::U64, Value::U64(v)) => v.write_le(out),
        (PrimitiveKind::I64, Value::I64(v)) => v.write_le(out),
        (PrimitiveKind::F32, Value::F32(v)) => v.write_le(out),
        (PrimitiveKind::F64, Value::F64(v)) => v.write_le(out),
        (PrimitiveKind::Pointer, Value::Pointer(v)) => v.write_le(out),
        (PrimitiveKind::Size, Value::Size(v)) => v.write_le(out),
        (PrimitiveKind::Bool, Value::Bool(v)) => v.write_le(out),
        _ => {
            return Err(EncodeError::TypeMismatch {
                field: field.to_string(),
                expected: kind.name().to_string(),
                found: value.kind_name(),
            })
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::read;

    fn abc() -> StructLayout {
        compute_layout(
            "Abc",
            [("a", FieldType::U32), ("b", FieldType::U64), ("c", FieldType::U32)],
        )
        .unwrap()
    }

    #[test]
    fn writes_fields_at_their_offsets() {
        let mut encoder = StructEncoder::new();
        let values = FieldValues::new()
            .with("a", Value::U32(0xdead_beef))
            .with("b", Value::U64(u64::MAX - 1))
            .with("c", Value::U32(7));
        let addr = encoder.encode(&abc(), &values).unwrap();
        let bytes = encoder.buffer(addr).unwrap().as_bytes();
        assert_eq!(bytes.len(), 24);
        assert_eq!(read::<u32>(bytes, 0).unwrap(), 0xdead_beef);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert_eq!(read::<u64>(bytes, 8).unwrap(), u64::MAX - 1);
        assert_eq!(read::<u32>(bytes, 16).unwrap(), 7);
    }

    #[test]
    fn mismatched_value_fails_fast() {
        let mut encoder = StructEncoder::new();
        let err = encoder
            .encode(&abc(), &FieldValues::new().with("b", Value::U32(1)))
            .unwrap_err();
        assert_eq!(
            err,
            EncodeError::TypeMismatch {
                field: "b".to_string(),
                expected: "u64".to_string(),
                found: "u32",
            }
        );
        assert_eq!(encoder.retained_count(), 0);
    }

    #[test]
    fn unknown_field_fails_fast() {
        let err = encode_to_buffer(&abc(), &FieldValues::new().with("d", Value::U32(1))).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownField { ref field, .. } if field == "d"));
    }

    #[test]
    fn arrays_truncate_to_declared_count() {
        let layout = compute_layout("Color", [("rgba", FieldType::array(PrimitiveKind::U8, 4)), ("tail", FieldType::U8)]).unwrap();
        let values = FieldValues::new()
            .with("rgba", Value::Array((1..=6).map(Value::U8).collect()))
            .with("tail", Value::U8(9));
        let buffer = encode_to_buffer(&layout, &values).unwrap();
        assert_eq!(buffer.as_bytes(), &[1, 2, 3, 4, 9]);

        let short = FieldValues::new().with("rgba", Value::Array(vec![Value::U8(5)]));
        let buffer = encode_to_buffer(&layout, &short).unwrap();
        assert_eq!(buffer.as_bytes(), &[5, 0, 0, 0, 0]);
    }

    #[test]
    fn string_view_descriptor() {
        let mut encoder = StructEncoder::new();
        let view = encoder.encode_string("hi").unwrap();
        assert_eq!(view.length, 2);

        let data = encoder.buffer(view.data).unwrap();
        assert_eq!(data.as_bytes(), b"hi");

        let descriptor = encoder.buffer(view.descriptor).unwrap().as_bytes();
        assert_eq!(descriptor.len(), 16);
        assert_eq!(read::<NativeAddress>(descriptor, 0).unwrap(), view.data);
        assert_eq!(read::<u64>(descriptor, 8).unwrap(), 2);
        assert_eq!(encoder.retained_count(), 2);
    }

    #[test]
    fn empty_string_is_null_view() {
        let mut encoder = StructEncoder::new();
        let view = encoder.encode_string("").unwrap();
        assert!(view.data.is_null());
        assert_eq!(view.length, 0);
        assert_eq!(encoder.retained_count(), 1);
    }

    #[test]
    fn cstring_is_terminated() {
        let mut encoder = StructEncoder::new();
        let addr = encoder.encode_cstring("main").unwrap();
        assert_eq!(encoder.buffer(addr).unwrap().as_bytes(), b"main\0");
        assert_eq!(encoder.encode_cstring("a\0b").unwrap_err(), EncodeError::InteriorNul { position: 1 });
    }

    #[test]
    fn pointer_and_primitive_arrays() {
        let mut encoder = StructEncoder::new();
        let handles = [NativeAddress::new(0x1000), NativeAddress::new(0x2000)];
        let addr = encoder.pointer_array(&handles).unwrap();
        let bytes = encoder.buffer(addr).unwrap().as_bytes();
        assert_eq!(read::<NativeAddress>(bytes, 8).unwrap(), NativeAddress::new(0x2000));
        assert!(encoder.pointer_array(&[]).unwrap().is_null());

        let addr = encoder
            .primitive_array(PrimitiveKind::U16, &[Value::U16(1), Value::U16(0x0203)])
            .unwrap();
        assert_eq!(encoder.buffer(addr).unwrap().as_bytes(), &[1, 0, 3, 2]);

        let err = encoder
            .primitive_array(PrimitiveKind::U16, &[Value::U32(1)])
            .unwrap_err();
        assert!(matches!(err, EncodeError::TypeMismatch { ref field, .. } if field == "[0]"));
    }

    #[test]
    fn release_all_drops_everything() {
        let mut encoder = StructEncoder::new();
        encoder.encode_string("label").unwrap();
        encoder.encode(&abc(), &FieldValues::new()).unwrap();
        assert_eq!(encoder.retained_count(), 3);
        assert_eq!(encoder.retained_bytes(), 5 + 16 + 24);
        assert_eq!(encoder.release_all(), 3);
        assert_eq!(encoder.retained_count(), 0);
    }
}
