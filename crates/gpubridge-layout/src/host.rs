use crate::{FieldType, LayoutError, PrimitiveKind, StructLayout};
use repc::layout::{Array, BuiltinType, Record, RecordField, RecordKind, Type, TypeLayout, TypeVariant};
use repc::Target;

/// Cross-checks computed layouts against the host C compiler's rules.
///
/// Uses the repc crate as an independent oracle: the struct is rebuilt as a
/// repc record type, laid out for the host target, and every offset plus the
/// total size and alignment are compared with ours.
pub struct HostLayoutCheck {
    target: Target,
}

impl HostLayoutCheck {
    /// Creates a checker for the host target.
    pub fn new() -> Result<Self, LayoutError> {
        let target = repc::HOST_TARGET.ok_or(LayoutError::UnsupportedHost)?;
        Ok(HostLayoutCheck { target })
    }

    /// Fails with `HostMismatch` if the host C layout differs from `layout`.
    pub fn verify(&self, layout: &StructLayout) -> Result<(), LayoutError> {
        let repc_type = struct_to_repc_type(layout);
        let computed = repc::compute_layout(self.target, &repc_type)?;
        compare(layout, &computed)
    }
}

fn compare(layout: &StructLayout, computed: &Type<TypeLayout>) -> Result<(), LayoutError> {
    let mismatch = |detail: String| LayoutError::HostMismatch {
        layout: layout.name().to_string(),
        detail,
    };

    let host_size = (computed.layout.size_bits / 8) as usize;
    let host_align = (computed.layout.field_alignment_bits / 8) as usize;
    if host_size != layout.size() {
        return Err(mismatch(format!("size {} vs host {}", layout.size(), host_size)));
    }
    // An empty C struct has no members to derive alignment from.
    if !layout.fields().is_empty() && host_align != layout.align() {
        return Err(mismatch(format!("align {} vs host {}", layout.align(), host_align)));
    }

    let record = match &computed.variant {
        TypeVariant::Record(record) => record,
        _ => return Err(mismatch("expected a record type".to_string())),
    };

    for (field, host_field) in layout.fields().iter().zip(record.fields.iter()) {
        let host_offset = host_field
            .layout
            .as_ref()
            .map(|l| (l.offset_bits / 8) as usize)
            .ok_or_else(|| mismatch(format!("no host offset for `{}`", field.name())))?;
        if host_offset != field.offset() {
            return Err(mismatch(format!(
                "field `{}` at {} vs host {}",
                field.name(),
                field.offset(),
                host_offset
            )));
        }
        if let (FieldType::Struct(inner), TypeVariant::Record(_)) = (field.ty(), &host_field.ty.variant) {
            compare(inner, &host_field.ty)?;
        }
    }

    Ok(())
}

fn struct_to_repc_type(layout: &StructLayout) -> Type<()> {
    let fields = layout
        .fields()
        .iter()
        .map(|field| RecordField {
            layout: None,
            annotations: vec![],
            named: true,
            bit_width: None,
            ty: field_to_repc_type(field.ty()),
        })
        .collect();

    Type {
        layout: (),
        annotations: vec![],
        variant: TypeVariant::Record(Record {
            kind: RecordKind::Struct,
            fields,
        }),
    }
}

fn field_to_repc_type(ty: &FieldType) -> Type<()> {
    match ty {
        FieldType::Primitive(kind) => builtin(*kind),
        FieldType::Struct(inner) => struct_to_repc_type(inner),
        FieldType::Array { element, count } => Type {
            layout: (),
            annotations: vec![],
            variant: TypeVariant::Array(Array {
                element_type: Box::new(builtin(*element)),
                num_elements: Some(*count as u64),
            }),
        },
    }
}

fn builtin(kind: PrimitiveKind) -> Type<()> {
    let builtin_type = match kind {
        PrimitiveKind::U8 => BuiltinType::UnsignedChar,
        PrimitiveKind::I8 => BuiltinType::Char,
        PrimitiveKind::U16 => BuiltinType::UnsignedShort,
        PrimitiveKind::I16 => BuiltinType::Short,
        PrimitiveKind::U32 => BuiltinType::UnsignedInt,
        PrimitiveKind::I32 => BuiltinType::Int,
        PrimitiveKind::U64 => BuiltinType::UnsignedLongLong,
        PrimitiveKind::I64 => BuiltinType::LongLong,
        PrimitiveKind::F32 => BuiltinType::Float,
        PrimitiveKind::F64 => BuiltinType::Double,
        // size_t is pointer-sized on every target the driver ships for.
        PrimitiveKind::Pointer | PrimitiveKind::Size => BuiltinType::Pointer,
        // The driver's boolean is a 32-bit unsigned integer.
        PrimitiveKind::Bool => BuiltinType::UnsignedInt,
    };
    Type {
        layout: (),
        annotations: vec![],
        variant: TypeVariant::Builtin(builtin_type),
    }
}
