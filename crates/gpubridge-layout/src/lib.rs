//! C-ABI struct layout engine.
//!
//! Given an ordered list of typed fields, computes per-field offsets, total
//! size and overall alignment exactly as a C compiler would with default
//! struct layout rules. Pure and stateless apart from the optional
//! [`LayoutComputer`] cache.

use miette::Diagnostic;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

mod compute;
pub mod helpers;
mod host;
mod kind;

pub use compute::{compute_layout, FieldLayout, LayoutBuilder, StructLayout};
pub use helpers::{align_to, check_invariants, resolve_path};
pub use host::HostLayoutCheck;
pub use kind::{FieldType, PrimitiveKind};

/// Errors that can occur during layout computation.
///
/// Every variant is a programming defect in a field list, never a runtime
/// condition to recover from.
#[derive(Error, Debug, Diagnostic)]
pub enum LayoutError {
    #[error("Unknown primitive kind `{0}`")]
    #[diagnostic(code(gpubridge_layout::unknown_primitive))]
    UnknownPrimitive(String),

    #[error("Field `{field}` declared twice in struct {layout}")]
    #[diagnostic(code(gpubridge_layout::duplicate_field))]
    DuplicateField { layout: String, field: String },

    #[error("Struct {layout} has no field `{field}`")]
    #[diagnostic(code(gpubridge_layout::unknown_field))]
    UnknownField { layout: String, field: String },

    #[error("Field `{field}` of struct {layout} is not a struct")]
    #[diagnostic(code(gpubridge_layout::not_a_struct))]
    NotAStruct { layout: String, field: String },

    #[error("Size of struct {layout} overflows at field `{field}`")]
    #[diagnostic(code(gpubridge_layout::overflow))]
    Overflow { layout: String, field: String },

    #[error("Layout invariant violated in struct {layout}: {detail}")]
    #[diagnostic(code(gpubridge_layout::invariant))]
    InvariantViolation { layout: String, detail: String },

    #[error("Host layout computation failed: {0}")]
    #[diagnostic(code(gpubridge_layout::repc))]
    RepcError(#[from] repc::Error),

    #[error("Unsupported host architecture for layout verification")]
    #[diagnostic(code(gpubridge_layout::unsupported_host))]
    UnsupportedHost,

    #[error("Struct {layout} disagrees with the host C layout: {detail}")]
    #[diagnostic(code(gpubridge_layout::host_mismatch))]
    HostMismatch { layout: String, detail: String },
}

/// Computes struct layouts once and hands out shared references afterwards.
///
/// Descriptor tables ask for the same structs on every call; the cache keys
/// layouts by their diagnostic name, so names must be unique per computer.
#[derive(Debug, Default)]
pub struct LayoutComputer {
    layouts: HashMap<String, Arc<StructLayout>>,
}

impl LayoutComputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached layout for `name`, computing it from `fields` on
    /// first use.
    pub fn get_or_compute<F>(&mut self, name: &str, fields: F) -> Result<Arc<StructLayout>, LayoutError>
    where
        F: FnOnce() -> Vec<(String, FieldType)>,
    {
        if let Some(layout) = self.layouts.get(name) {
            return Ok(Arc::clone(layout));
        }
        let layout = Arc::new(compute_layout(name, fields())?);
        log::debug!("cached layout {} (size {}, align {})", name, layout.size(), layout.align());
        self.layouts.insert(name.to_string(), Arc::clone(&layout));
        Ok(layout)
    }

    /// Registers an already computed layout under its own name.
    pub fn insert(&mut self, layout: StructLayout) -> Arc<StructLayout> {
        let layout = Arc::new(layout);
        self.layouts.insert(layout.name().to_string(), Arc::clone(&layout));
        layout
    }

    pub fn get(&self, name: &str) -> Option<Arc<StructLayout>> {
        self.layouts.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
