use crate::{FieldLayout, FieldType, LayoutError, StructLayout};

/// Rounds `offset` up to the next multiple of `align`.
///
/// `align` must be non-zero; every field type has an alignment of at least 1.
pub const fn align_to(offset: usize, align: usize) -> usize {
    let rem = offset % align;
    if rem == 0 {
        offset
    } else {
        offset + (align - rem)
    }
}

/// Resolves a dotted field path (`"limits.maxBindGroups"`) through nested
/// structs and returns the absolute offset together with the leaf field.
pub fn resolve_path<'a>(
    layout: &'a StructLayout,
    path: &str,
) -> Result<(usize, &'a FieldLayout), LayoutError> {
    let mut current = layout;
    let mut base = 0usize;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let field = current.field(segment).ok_or_else(|| LayoutError::UnknownField {
            layout: current.name().to_string(),
            field: segment.to_string(),
        })?;
        if segments.peek().is_none() {
            return Ok((base + field.offset(), field));
        }
        match field.ty() {
            FieldType::Struct(inner) => {
                base += field.offset();
                current = inner;
            }
            _ => {
                return Err(LayoutError::NotAStruct {
                    layout: current.name().to_string(),
                    field: segment.to_string(),
                })
            }
        }
    }

    Err(LayoutError::UnknownField {
        layout: layout.name().to_string(),
        field: path.to_string(),
    })
}

/// Checks the C layout invariants of a computed layout: every field is
/// aligned, no two fields overlap, and the size is a multiple of the
/// alignment and covers every field.
pub fn check_invariants(layout: &StructLayout) -> Result<(), LayoutError> {
    let violation = |detail: String| LayoutError::InvariantViolation {
        layout: layout.name().to_string(),
        detail,
    };

    if layout.align() == 0 || layout.size() % layout.align() != 0 {
        return Err(violation(format!(
            "size {} is not a multiple of alignment {}",
            layout.size(),
            layout.align()
        )));
    }

    for field in layout.fields() {
        if field.offset() % field.align() != 0 {
            return Err(violation(format!(
                "field `{}` at offset {} is not {}-byte aligned",
                field.name(),
                field.offset(),
                field.align()
            )));
        }
        if field.end() > layout.size() {
            return Err(violation(format!(
                "field `{}` ends at {} past struct size {}",
                field.name(),
                field.end(),
                layout.size()
            )));
        }
    }

    for pair in layout.fields().windows(2) {
        if pair[0].end() > pair[1].offset() {
            return Err(violation(format!(
                "fields `{}` and `{}` overlap",
                pair[0].name(),
                pair[1].name()
            )));
        }
    }

    Ok(())
}
