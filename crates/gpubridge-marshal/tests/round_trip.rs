use gpubridge_layout::{compute_layout, FieldType, PrimitiveKind, StructLayout};
use gpubridge_marshal::{
    decode_struct, read, read_string_view, read_struct_array, DecodeError, EncodeError, FieldValues, NativeAddress,
    NativeView, PinnedAllocations, StructEncoder, Value,
};
use proptest::prelude::*;
use std::sync::Arc;

// --- Test Helpers ---

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn every_kind() -> StructLayout {
    compute_layout(
        "EveryKind",
        PrimitiveKind::ALL
            .iter()
            .map(|kind| (kind.name().to_string(), FieldType::Primitive(*kind))),
    )
    .unwrap()
}

fn sample(kind: PrimitiveKind) -> Value {
    match kind {
        PrimitiveKind::U8 => Value::U8(0xab),
        PrimitiveKind::I8 => Value::I8(-5),
        PrimitiveKind::U16 => Value::U16(0xbeef),
        PrimitiveKind::I16 => Value::I16(-300),
        PrimitiveKind::U32 => Value::U32(0xdead_beef),
        PrimitiveKind::I32 => Value::I32(-70_000),
        PrimitiveKind::U64 => Value::U64(0x0123_4567_89ab_cdef),
        PrimitiveKind::I64 => Value::I64(-1),
        PrimitiveKind::F32 => Value::F32(1.5),
        PrimitiveKind::F64 => Value::F64(-0.25),
        PrimitiveKind::Pointer => Value::Pointer(NativeAddress::new(0x7f00_1000)),
        PrimitiveKind::Size => Value::Size(4096),
        PrimitiveKind::Bool => Value::Bool(true),
    }
}

fn extent_3d() -> Arc<StructLayout> {
    Arc::new(
        compute_layout(
            "Extent3D",
            [
                ("width", FieldType::U32),
                ("height", FieldType::U32),
                ("depthOrArrayLayers", FieldType::U32),
            ],
        )
        .unwrap(),
    )
}

fn texture_descriptor() -> StructLayout {
    StructLayout::builder("TextureDescriptor")
        .field("nextInChain", FieldType::POINTER)
        .field("usage", FieldType::U64)
        .field("size", FieldType::nested(extent_3d()))
        .field("format", FieldType::U32)
        .field("viewFormats", FieldType::array(PrimitiveKind::U32, 2))
        .field("mipped", FieldType::BOOL)
        .build()
        .unwrap()
}

fn extent(width: u32, height: u32, layers: u32) -> FieldValues {
    FieldValues::new()
        .with("width", Value::U32(width))
        .with("height", Value::U32(height))
        .with("depthOrArrayLayers", Value::U32(layers))
}

// --- Tests ---

#[test]
fn test_every_primitive_round_trips() {
    init_logging();
    let layout = every_kind();
    let values: FieldValues = PrimitiveKind::ALL
        .iter()
        .map(|kind| (kind.name(), sample(*kind)))
        .collect();

    let mut encoder = StructEncoder::new();
    let addr = encoder.encode(&layout, &values).unwrap();
    let view = NativeView::from_bytes(encoder.buffer(addr).unwrap().as_bytes());
    assert_eq!(view.bytes().len(), layout.size());
    assert_eq!(view.decode_struct(&layout).unwrap(), values);
}

#[test]
fn test_nested_and_array_fields_round_trip() {
    let layout = texture_descriptor();
    let values = FieldValues::new()
        .with("usage", Value::U64(0x10))
        .with("size", Value::Struct(extent(640, 480, 1)))
        .with("format", Value::U32(23))
        .with("viewFormats", Value::Array(vec![Value::U32(23), Value::U32(24)]))
        .with("mipped", Value::Bool(true));

    let mut encoder = StructEncoder::new();
    let addr = encoder.encode(&layout, &values).unwrap();
    let decoded = decode_struct(&layout, encoder.buffer(addr).unwrap().as_bytes()).unwrap();

    assert_eq!(decoded.get("nextInChain"), Some(&Value::Pointer(NativeAddress::NULL)));
    assert_eq!(decoded.get("size"), Some(&Value::Struct(extent(640, 480, 1))));
    assert_eq!(
        decoded.get("viewFormats"),
        Some(&Value::Array(vec![Value::U32(23), Value::U32(24)]))
    );
    assert_eq!(decoded.get("mipped").and_then(Value::as_bool), Some(true));
}

#[test]
fn test_omitted_fields_are_zero() {
    let layout = texture_descriptor();
    let mut encoder = StructEncoder::new();
    let addr = encoder.encode(&layout, &FieldValues::new()).unwrap();
    let bytes = encoder.buffer(addr).unwrap().as_bytes();
    assert_eq!(bytes.len(), layout.size());
    assert!(bytes.iter().all(|b| *b == 0));
}

#[test]
fn test_string_scenario() {
    let mut encoder = StructEncoder::new();
    let view = encoder.encode_string("hi").unwrap();

    assert_eq!(encoder.buffer(view.data).unwrap().as_bytes(), b"hi");
    let descriptor = encoder.buffer(view.descriptor).unwrap().as_bytes();
    assert_eq!(descriptor.len(), 16);
    assert_eq!(read::<NativeAddress>(descriptor, 0).unwrap(), view.data);
    assert_eq!(read::<usize>(descriptor, 8).unwrap(), 2);

    let text = unsafe { read_string_view(view.descriptor) }.unwrap();
    assert_eq!(text.as_deref(), Some("hi"));
}

#[test]
fn test_struct_pointing_at_string() {
    let layout = compute_layout(
        "Labelled",
        [("nextInChain", FieldType::POINTER), ("label", FieldType::POINTER), ("count", FieldType::U32)],
    )
    .unwrap();
    let mut encoder = StructEncoder::new();
    let label = encoder.encode_string("compute pass").unwrap();
    let values = FieldValues::new()
        .with("label", Value::Pointer(label.descriptor))
        .with("count", Value::U32(3));
    let addr = encoder.encode(&layout, &values).unwrap();

    let decoded = decode_struct(&layout, encoder.buffer(addr).unwrap().as_bytes()).unwrap();
    let label_addr = decoded.get("label").and_then(Value::as_address).unwrap();
    let text = unsafe { read_string_view(label_addr) }.unwrap();
    assert_eq!(text.as_deref(), Some("compute pass"));
    assert_eq!(encoder.retained_count(), 3);
}

#[test]
fn test_type_mismatch_names_the_field() {
    let layout = texture_descriptor();
    let mut encoder = StructEncoder::new();
    let err = encoder
        .encode(&layout, &FieldValues::new().with("size", Value::U32(1)))
        .unwrap_err();
    match err {
        EncodeError::TypeMismatch { field, expected, found } => {
            assert_eq!(field, "size");
            assert_eq!(expected, "struct Extent3D");
            assert_eq!(found, "u32");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_struct_array_round_trip() {
    let layout = extent_3d();
    let elements = vec![extent(1, 2, 3), extent(4, 5, 6), extent(7, 8, 9)];
    let mut encoder = StructEncoder::new();
    let addr = encoder.encode_array_of_structs(&layout, &elements).unwrap();
    assert_eq!(encoder.buffer(addr).unwrap().len(), 36);

    let decoded = unsafe { read_struct_array(addr, elements.len(), &layout) }.unwrap();
    assert_eq!(decoded, elements);
    assert!(encoder.encode_array_of_structs(&layout, &[]).unwrap().is_null());
    assert!(unsafe { read_struct_array(NativeAddress::NULL, 0, &layout) }.unwrap().is_empty());
}

#[test]
fn test_zero_sized_struct_array_round_trip() {
    let empty = compute_layout::<_, String>("Empty", []).unwrap();
    let elements = vec![FieldValues::new(), FieldValues::new()];
    let mut encoder = StructEncoder::new();
    let addr = encoder.encode_array_of_structs(&empty, &elements).unwrap();

    let decoded = unsafe { read_struct_array(addr, elements.len(), &empty) }.unwrap();
    assert_eq!(decoded, elements);
}

#[test]
fn test_struct_array_rejects_null_with_count() {
    let layout = extent_3d();
    let err = unsafe { read_struct_array(NativeAddress::NULL, 2, &layout) }.unwrap_err();
    assert!(matches!(err, DecodeError::NullPointer { .. }));
}

#[test]
fn test_pinned_memory_outlives_encoder() {
    init_logging();
    let owner = NativeAddress::new(0xabc0);
    let mut pinned = PinnedAllocations::new();
    let descriptor = {
        let mut encoder = StructEncoder::new();
        let view = encoder.encode_string("vs_main").unwrap();
        pinned.adopt(owner, &mut encoder);
        view.descriptor
    };
    let text = unsafe { read_string_view(descriptor) }.unwrap();
    assert_eq!(text.as_deref(), Some("vs_main"));
    assert_eq!(pinned.release(owner), 2);
    assert_eq!(pinned.pinned_count(), 0);
}

// --- Generated round trips ---

fn arb_value(kind: PrimitiveKind) -> BoxedStrategy<Value> {
    match kind {
        PrimitiveKind::U8 => any::<u8>().prop_map(Value::U8).boxed(),
        PrimitiveKind::I8 => any::<i8>().prop_map(Value::I8).boxed(),
        PrimitiveKind::U16 => any::<u16>().prop_map(Value::U16).boxed(),
        PrimitiveKind::I16 => any::<i16>().prop_map(Value::I16).boxed(),
        PrimitiveKind::U32 => any::<u32>().prop_map(Value::U32).boxed(),
        PrimitiveKind::I32 => any::<i32>().prop_map(Value::I32).boxed(),
        PrimitiveKind::U64 => any::<u64>().prop_map(Value::U64).boxed(),
        PrimitiveKind::I64 => any::<i64>().prop_map(Value::I64).boxed(),
        PrimitiveKind::F32 => (-1.0e6f32..1.0e6f32).prop_map(Value::F32).boxed(),
        PrimitiveKind::F64 => (-1.0e12f64..1.0e12f64).prop_map(Value::F64).boxed(),
        PrimitiveKind::Pointer => any::<usize>()
            .prop_map(|raw| Value::Pointer(NativeAddress::new(raw)))
            .boxed(),
        PrimitiveKind::Size => any::<usize>().prop_map(Value::Size).boxed(),
        PrimitiveKind::Bool => any::<bool>().prop_map(Value::Bool).boxed(),
    }
}

fn arb_field() -> impl Strategy<Value = (PrimitiveKind, Value)> {
    proptest::sample::select(PrimitiveKind::ALL.to_vec())
        .prop_flat_map(|kind| arb_value(kind).prop_map(move |value| (kind, value)))
}

proptest! {
    #[test]
    fn encoded_fields_decode_to_the_same_values(fields in prop::collection::vec(arb_field(), 1..12)) {
        let layout = compute_layout(
            "Generated",
            fields.iter().enumerate().map(|(i, (kind, _))| (format!("f{}", i), FieldType::Primitive(*kind))),
        )
        .unwrap();
        let values: FieldValues = fields
            .into_iter()
            .enumerate()
            .map(|(i, (_, value))| (format!("f{}", i), value))
            .collect();

        let mut encoder = StructEncoder::new();
        let addr = encoder.encode(&layout, &values).unwrap();
        let decoded = decode_struct(&layout, encoder.buffer(addr).unwrap().as_bytes()).unwrap();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn struct_arrays_decode_in_order(widths in prop::collection::vec(any::<u32>(), 1..16)) {
        let layout = extent_3d();
        let elements: Vec<FieldValues> = widths.iter().map(|w| extent(*w, w.wrapping_add(1), 1)).collect();
        let mut encoder = StructEncoder::new();
        let addr = encoder.encode_array_of_structs(&layout, &elements).unwrap();
        let decoded = unsafe { read_struct_array(addr, elements.len(), &layout) }.unwrap();
        prop_assert_eq!(decoded, elements);
    }
}
