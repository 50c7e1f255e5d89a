use crate::{LayoutError, StructLayout};
use std::fmt;
use std::sync::Arc;

/// The scalar vocabulary shared by struct fields and native call arguments.
///
/// Sizes and alignments follow the 64-bit host ABI the native driver library
/// is built for. `Bool` is the library's 32-bit boolean, not a 1-byte C `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Pointer,
    Size,
    Bool,
}

impl PrimitiveKind {
    /// Every kind, in declaration order.
    pub const ALL: [PrimitiveKind; 13] = [
        PrimitiveKind::U8,
        PrimitiveKind::I8,
        PrimitiveKind::U16,
        PrimitiveKind::I16,
        PrimitiveKind::U32,
        PrimitiveKind::I32,
        PrimitiveKind::U64,
        PrimitiveKind::I64,
        PrimitiveKind::F32,
        PrimitiveKind::F64,
        PrimitiveKind::Pointer,
        PrimitiveKind::Size,
        PrimitiveKind::Bool,
    ];

    /// Size in bytes.
    pub const fn size(self) -> usize {
        match self {
            PrimitiveKind::U8 | PrimitiveKind::I8 => 1,
            PrimitiveKind::U16 | PrimitiveKind::I16 => 2,
            PrimitiveKind::U32 | PrimitiveKind::I32 | PrimitiveKind::F32 | PrimitiveKind::Bool => 4,
            PrimitiveKind::U64
            | PrimitiveKind::I64
            | PrimitiveKind::F64
            | PrimitiveKind::Pointer
            | PrimitiveKind::Size => 8,
        }
    }

    /// Alignment in bytes. Every primitive is naturally aligned.
    pub const fn align(self) -> usize {
        self.size()
    }

    /// Canonical lowercase name, as used in signature tables and diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::U8 => "u8",
            PrimitiveKind::I8 => "i8",
            PrimitiveKind::U16 => "u16",
            PrimitiveKind::I16 => "i16",
            PrimitiveKind::U32 => "u32",
            PrimitiveKind::I32 => "i32",
            PrimitiveKind::U64 => "u64",
            PrimitiveKind::I64 => "i64",
            PrimitiveKind::F32 => "f32",
            PrimitiveKind::F64 => "f64",
            PrimitiveKind::Pointer => "pointer",
            PrimitiveKind::Size => "size",
            PrimitiveKind::Bool => "bool",
        }
    }

    /// Parses a canonical kind name. Anything else is a layout defect.
    pub fn from_name(name: &str) -> Result<Self, LayoutError> {
        PrimitiveKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| LayoutError::UnknownPrimitive(name.to_string()))
    }

    /// True for the kinds that carry an address-sized integer.
    pub const fn is_address_sized(self) -> bool {
        matches!(self, PrimitiveKind::Pointer | PrimitiveKind::Size)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, PrimitiveKind::F32 | PrimitiveKind::F64)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The declared type of a struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Primitive(PrimitiveKind),
    /// A nested struct stored inline; contributes its own size and alignment.
    Struct(Arc<StructLayout>),
    /// A fixed-size inline array of primitives.
    Array { element: PrimitiveKind, count: usize },
}

impl FieldType {
    pub const U8: FieldType = FieldType::Primitive(PrimitiveKind::U8);
    pub const I8: FieldType = FieldType::Primitive(PrimitiveKind::I8);
    pub const U16: FieldType = FieldType::Primitive(PrimitiveKind::U16);
    pub const I16: FieldType = FieldType::Primitive(PrimitiveKind::I16);
    pub const U32: FieldType = FieldType::Primitive(PrimitiveKind::U32);
    pub const I32: FieldType = FieldType::Primitive(PrimitiveKind::I32);
    pub const U64: FieldType = FieldType::Primitive(PrimitiveKind::U64);
    pub const I64: FieldType = FieldType::Primitive(PrimitiveKind::I64);
    pub const F32: FieldType = FieldType::Primitive(PrimitiveKind::F32);
    pub const F64: FieldType = FieldType::Primitive(PrimitiveKind::F64);
    pub const POINTER: FieldType = FieldType::Primitive(PrimitiveKind::Pointer);
    pub const SIZE: FieldType = FieldType::Primitive(PrimitiveKind::Size);
    pub const BOOL: FieldType = FieldType::Primitive(PrimitiveKind::Bool);

    pub fn nested(layout: impl Into<Arc<StructLayout>>) -> Self {
        FieldType::Struct(layout.into())
    }

    pub fn array(element: PrimitiveKind, count: usize) -> Self {
        FieldType::Array { element, count }
    }

    /// Alignment in bytes.
    pub fn align(&self) -> usize {
        match self {
            FieldType::Primitive(kind) => kind.align(),
            FieldType::Struct(layout) => layout.align(),
            FieldType::Array { element, .. } => element.align(),
        }
    }

    /// Size in bytes, or `None` when an array's byte size overflows `usize`.
    pub fn checked_size(&self) -> Option<usize> {
        match self {
            FieldType::Primitive(kind) => Some(kind.size()),
            FieldType::Struct(layout) => Some(layout.size()),
            FieldType::Array { element, count } => element.size().checked_mul(*count),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Primitive(kind) => write!(f, "{}", kind),
            FieldType::Struct(layout) => write!(f, "struct {}", layout.name()),
            FieldType::Array { element, count } => write!(f, "[{}; {}]", element, count),
        }
    }
}
