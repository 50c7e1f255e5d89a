use crate::helpers::align_to;
use crate::{FieldType, LayoutError};
use std::collections::HashSet;
use std::fmt;

/// One field of a computed struct layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    name: String,
    ty: FieldType,
    offset: usize,
    size: usize,
    align: usize,
}

impl FieldLayout {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    /// Byte offset from the start of the enclosing struct.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn align(&self) -> usize {
        self.align
    }

    /// First byte past the end of this field.
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// A C-compatible struct layout: ordered fields with offsets, total size and
/// overall alignment. Produced only by [`compute_layout`], so every instance
/// satisfies the C layout rules for its field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    name: String,
    fields: Vec<FieldLayout>,
    size: usize,
    align: usize,
}

impl StructLayout {
    /// Starts a builder for a struct with the given diagnostic name.
    pub fn builder(name: impl Into<String>) -> LayoutBuilder {
        LayoutBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Diagnostic name. Not part of the binary layout.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Total size in bytes, including trailing padding.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Overall alignment: the maximum member alignment, or 1 when empty.
    pub fn align(&self) -> usize {
        self.align
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Offset of a named field, failing if the struct has no such field.
    pub fn offset_of(&self, name: &str) -> Result<usize, LayoutError> {
        self.field(name)
            .map(FieldLayout::offset)
            .ok_or_else(|| LayoutError::UnknownField {
                layout: self.name.clone(),
                field: name.to_string(),
            })
    }
}

impl fmt::Display for StructLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "struct {} (size {}, align {})", self.name, self.size, self.align)?;
        for field in &self.fields {
            writeln!(
                f,
                "  @{:<4} {}: {} (size {}, align {})",
                field.offset, field.name, field.ty, field.size, field.align
            )?;
        }
        Ok(())
    }
}

/// Accumulates an ordered field list and hands it to [`compute_layout`].
#[derive(Debug, Clone)]
pub struct LayoutBuilder {
    name: String,
    fields: Vec<(String, FieldType)>,
}

impl LayoutBuilder {
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push((name.into(), ty));
        self
    }

    pub fn build(self) -> Result<StructLayout, LayoutError> {
        compute_layout(self.name, self.fields)
    }
}

/// Computes the C layout of an ordered field list.
///
/// Walks the fields in declaration order keeping a running offset and a
/// running maximum alignment. Each field starts at the running offset rounded
/// up to its own alignment; the total size is the final offset rounded up to
/// the maximum alignment. This is the default C struct layout with no packing.
pub fn compute_layout<N, S>(
    name: N,
    fields: impl IntoIterator<Item = (S, FieldType)>,
) -> Result<StructLayout, LayoutError>
where
    N: Into<String>,
    S: Into<String>,
{
    let name = name.into();
    let mut seen = HashSet::new();
    let mut laid_out = Vec::new();
    let mut offset = 0usize;
    let mut max_align = 1usize;

    for (field_name, ty) in fields {
        let field_name = field_name.into();
        if !seen.insert(field_name.clone()) {
            return Err(LayoutError::DuplicateField {
                layout: name,
                field: field_name,
            });
        }

        let align = ty.align();
        let size = ty.checked_size().ok_or_else(|| LayoutError::Overflow {
            layout: name.clone(),
            field: field_name.clone(),
        })?;

        let field_offset = align_to(offset, align);
        offset = field_offset
            .checked_add(size)
            .ok_or_else(|| LayoutError::Overflow {
                layout: name.clone(),
                field: field_name.clone(),
            })?;
        max_align = max_align.max(align);

        laid_out.push(FieldLayout {
            name: field_name,
            ty,
            offset: field_offset,
            size,
            align,
        });
    }

    let size = align_to(offset, max_align);
    log::trace!("computed layout {}: size {}, align {}", name, size, max_align);

    Ok(StructLayout {
        name,
        fields: laid_out,
        size,
        align: max_align,
    })
}
