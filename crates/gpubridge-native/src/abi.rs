//! Structures and constants from the native C header.
//!
//! Struct layouts are declared as field lists and laid out by the layout
//! engine, so every offset follows from the declared types. The tests pin the
//! offsets the header documents.

use gpubridge_layout::{FieldType, LayoutComputer, LayoutError, StructLayout};
use gpubridge_marshal::{string_from_view, DecodeError, NativeAddress};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::os::raw::c_char;
use std::sync::Arc;

pub use gpubridge_marshal::STRLEN;

/// Status value every callback kind uses for success.
pub const STATUS_SUCCESS: u32 = 1;
/// Status delivered when the instance is dropped with the callback pending.
pub const STATUS_CALLBACK_CANCELLED: u32 = 2;

pub const MAP_MODE_READ: u64 = 0x1;
pub const MAP_MODE_WRITE: u64 = 0x2;

/// When the native library is allowed to fire a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum CallbackMode {
    WaitAnyOnly = 1,
    #[default]
    AllowProcessEvents = 2,
    AllowSpontaneous = 3,
}

impl CallbackMode {
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

/// `WGPUErrorType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    NoError,
    Validation,
    OutOfMemory,
    Internal,
    Unknown,
}

impl ErrorType {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => ErrorType::NoError,
            2 => ErrorType::Validation,
            3 => ErrorType::OutOfMemory,
            4 => ErrorType::Internal,
            _ => ErrorType::Unknown,
        }
    }
}

/// `WGPUDeviceLostReason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceLostReason {
    Unknown,
    Destroyed,
    CallbackCancelled,
    FailedCreation,
}

impl DeviceLostReason {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            2 => DeviceLostReason::Destroyed,
            3 => DeviceLostReason::CallbackCancelled,
            4 => DeviceLostReason::FailedCreation,
            _ => DeviceLostReason::Unknown,
        }
    }
}

/// `WGPUCompilationMessageType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilationMessageType {
    Error,
    Warning,
    Info,
}

impl CompilationMessageType {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => CompilationMessageType::Error,
            2 => CompilationMessageType::Warning,
            _ => CompilationMessageType::Info,
        }
    }
}

/// A string view as callbacks receive it, by value.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawStringView {
    pub data: *const c_char,
    pub length: usize,
}

impl RawStringView {
    pub const NULL: RawStringView = RawStringView {
        data: std::ptr::null(),
        length: 0,
    };

    /// Copies the text out. `None` when the view carries no string.
    ///
    /// # Safety
    /// The view must describe readable memory, as the native side guarantees
    /// for the duration of a callback.
    pub unsafe fn to_text(self) -> Result<Option<String>, DecodeError> {
        string_from_view(NativeAddress::from_ptr(self.data), self.length)
    }
}

/// Layouts of the header structures the core reads or writes directly.
#[derive(Debug, Clone)]
pub struct AbiLayouts {
    pub string_view: Arc<StructLayout>,
    pub chained_struct: Arc<StructLayout>,
    pub callback_info: Arc<StructLayout>,
    pub compilation_message: Arc<StructLayout>,
    pub compilation_info: Arc<StructLayout>,
    pub limits: Arc<StructLayout>,
}

fn owned(fields: &[(&str, FieldType)]) -> Vec<(String, FieldType)> {
    fields.iter().map(|(name, ty)| (name.to_string(), ty.clone())).collect()
}

const LIMITS_U32_HEAD: &[&str] = &[
    "maxTextureDimension1D",
    "maxTextureDimension2D",
    "maxTextureDimension3D",
    "maxTextureArrayLayers",
    "maxBindGroups",
    "maxBindGroupsPlusVertexBuffers",
    "maxBindingsPerBindGroup",
    "maxDynamicUniformBuffersPerPipelineLayout",
    "maxDynamicStorageBuffersPerPipelineLayout",
    "maxSampledTexturesPerShaderStage",
    "maxSamplersPerShaderStage",
    "maxStorageBuffersPerShaderStage",
    "maxStorageTexturesPerShaderStage",
    "maxUniformBuffersPerShaderStage",
];

const LIMITS_U32_TAIL: &[&str] = &[
    "maxVertexAttributes",
    "maxVertexBufferArrayStride",
    "maxInterStageShaderVariables",
    "maxColorAttachments",
    "maxColorAttachmentBytesPerSample",
    "maxComputeWorkgroupStorageSize",
    "maxComputeInvocationsPerWorkgroup",
    "maxComputeWorkgroupSizeX",
    "maxComputeWorkgroupSizeY",
    "maxComputeWorkgroupSizeZ",
    "maxComputeWorkgroupsPerDimension",
];

fn limits_fields() -> Vec<(String, FieldType)> {
    let mut fields = vec![("nextInChain".to_string(), FieldType::POINTER)];
    fields.extend(LIMITS_U32_HEAD.iter().map(|name| (name.to_string(), FieldType::U32)));
    fields.extend(owned(&[
        ("maxUniformBufferBindingSize", FieldType::U64),
        ("maxStorageBufferBindingSize", FieldType::U64),
        ("minUniformBufferOffsetAlignment", FieldType::U32),
        ("minStorageBufferOffsetAlignment", FieldType::U32),
        ("maxVertexBuffers", FieldType::U32),
        ("maxBufferSize", FieldType::U64),
    ]));
    fields.extend(LIMITS_U32_TAIL.iter().map(|name| (name.to_string(), FieldType::U32)));
    fields
}

impl AbiLayouts {
    pub fn compute(computer: &mut LayoutComputer) -> Result<Self, LayoutError> {
        let string_view = computer.get_or_compute("StringView", || {
            owned(&[("data", FieldType::POINTER), ("length", FieldType::SIZE)])
        })?;
        let chained_struct = computer.get_or_compute("ChainedStruct", || {
            owned(&[("next", FieldType::POINTER), ("sType", FieldType::U32)])
        })?;
        let callback_info = computer.get_or_compute("CallbackInfo", || {
            owned(&[
                ("nextInChain", FieldType::POINTER),
                ("mode", FieldType::U32),
                ("callback", FieldType::POINTER),
                ("userdata1", FieldType::POINTER),
                ("userdata2", FieldType::POINTER),
            ])
        })?;
        let message_text = FieldType::nested(Arc::clone(&string_view));
        let compilation_message = computer.get_or_compute("CompilationMessage", || {
            owned(&[
                ("nextInChain", FieldType::POINTER),
                ("message", message_text),
                ("type", FieldType::U32),
                ("lineNum", FieldType::U64),
                ("linePos", FieldType::U64),
                ("offset", FieldType::U64),
                ("length", FieldType::U64),
            ])
        })?;
        let compilation_info = computer.get_or_compute("CompilationInfo", || {
            owned(&[
                ("nextInChain", FieldType::POINTER),
                ("messageCount", FieldType::SIZE),
                ("messages", FieldType::POINTER),
            ])
        })?;
        let limits = computer.get_or_compute("Limits", limits_fields)?;

        Ok(AbiLayouts {
            string_view,
            chained_struct,
            callback_info,
            compilation_message,
            compilation_info,
            limits,
        })
    }
}

static LAYOUTS: Lazy<AbiLayouts> = Lazy::new(|| {
    AbiLayouts::compute(&mut LayoutComputer::new()).expect("native header layouts must be valid")
});

/// The header layouts, computed on first use.
pub fn layouts() -> &'static AbiLayouts {
    &LAYOUTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_void;
    use std::mem::{align_of, size_of};

    #[repr(C)]
    struct HostCallbackInfo {
        next_in_chain: *const c_void,
        mode: u32,
        callback: *const c_void,
        userdata1: *mut c_void,
        userdata2: *mut c_void,
    }

    #[test]
    fn string_view_matches_repr_c() {
        let view = &layouts().string_view;
        assert_eq!(view.size(), size_of::<RawStringView>());
        assert_eq!(view.align(), align_of::<RawStringView>());
        assert_eq!(view.offset_of("length").unwrap(), 8);
    }

    #[test]
    fn chained_struct_offsets() {
        let chain = &layouts().chained_struct;
        assert_eq!(chain.offset_of("next").unwrap(), 0);
        assert_eq!(chain.offset_of("sType").unwrap(), 8);
        assert_eq!(chain.size(), 16);
    }

    #[test]
    fn callback_info_offsets() {
        let info = &layouts().callback_info;
        let offsets: Vec<_> = info.fields().iter().map(|field| field.offset()).collect();
        assert_eq!(offsets, vec![0, 8, 16, 24, 32]);
        assert_eq!(info.size(), 40);
        assert_eq!(info.size(), size_of::<HostCallbackInfo>());
    }

    #[test]
    fn compilation_message_offsets() {
        let message = &layouts().compilation_message;
        assert_eq!(message.offset_of("message").unwrap(), 8);
        assert_eq!(message.offset_of("type").unwrap(), 24);
        assert_eq!(message.offset_of("lineNum").unwrap(), 32);
        assert_eq!(message.offset_of("length").unwrap(), 56);
        assert_eq!(message.size(), 64);
        assert_eq!(layouts().compilation_info.size(), 24);
    }

    #[test]
    fn limits_offsets() {
        let limits = &layouts().limits;
        assert_eq!(limits.offset_of("maxUniformBufferBindingSize").unwrap(), 64);
        assert_eq!(limits.offset_of("maxBufferSize").unwrap(), 96);
        assert_eq!(limits.offset_of("maxComputeWorkgroupsPerDimension").unwrap(), 144);
        assert_eq!(limits.size(), 152);
    }

    #[test]
    fn enum_decoding() {
        assert_eq!(ErrorType::from_raw(2), ErrorType::Validation);
        assert_eq!(ErrorType::from_raw(99), ErrorType::Unknown);
        assert_eq!(DeviceLostReason::from_raw(2), DeviceLostReason::Destroyed);
        assert_eq!(CompilationMessageType::from_raw(1), CompilationMessageType::Error);
        assert_eq!(CallbackMode::AllowProcessEvents as u32, 2);
    }

    #[test]
    fn raw_view_to_text() {
        let text = b"oops";
        let view = RawStringView {
            data: text.as_ptr() as *const c_char,
            length: 4,
        };
        assert_eq!(unsafe { view.to_text() }.unwrap().as_deref(), Some("oops"));
        assert_eq!(unsafe { RawStringView::NULL.to_text() }.unwrap(), None);
    }
}
