use crate::NativeAddress;
use gpubridge_layout::PrimitiveKind;
use indexmap::IndexMap;

/// A high-level value destined for (or read from) a native struct field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Pointer(NativeAddress),
    Size(usize),
    Bool(bool),
    Struct(FieldValues),
    Array(Vec<Value>),
}

impl Value {
    /// Short type name used in mismatch diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Struct(_) => "struct",
            Value::Array(_) => "array",
            other => other.primitive_kind().map(PrimitiveKind::name).unwrap_or("value"),
        }
    }

    /// The primitive kind this value encodes as, if it is a scalar.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            Value::U8(_) => PrimitiveKind::U8,
            Value::I8(_) => PrimitiveKind::I8,
            Value::U16(_) => PrimitiveKind::U16,
            Value::I16(_) => PrimitiveKind::I16,
            Value::U32(_) => PrimitiveKind::U32,
            Value::I32(_) => PrimitiveKind::I32,
            Value::U64(_) => PrimitiveKind::U64,
            Value::I64(_) => PrimitiveKind::I64,
            Value::F32(_) => PrimitiveKind::F32,
            Value::F64(_) => PrimitiveKind::F64,
            Value::Pointer(_) => PrimitiveKind::Pointer,
            Value::Size(_) => PrimitiveKind::Size,
            Value::Bool(_) => PrimitiveKind::Bool,
            Value::Struct(_) | Value::Array(_) => return None,
        })
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<NativeAddress> {
        match self {
            Value::Pointer(addr) => Some(*addr),
            _ => None,
        }
    }

    pub fn as_size(&self) -> Option<usize> {
        match self {
            Value::Size(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&FieldValues> {
        match self {
            Value::Struct(values) => Some(values),
            _ => None,
        }
    }
}

/// Field name → value map for one struct, in insertion order.
///
/// Fields left out are encoded as zero, which is the native default for
/// pointers, counts and optional flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    values: IndexMap<String, Value>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        FieldValues {
            values: iter.into_iter().map(|(name, value)| (name.into(), value)).collect(),
        }
    }
}
