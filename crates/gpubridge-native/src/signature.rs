//! The native function table.
//!
//! Every entry point the core calls is listed here with its C argument kinds
//! and return kind, in the same vocabulary the layout engine uses for struct
//! fields. Handles and struct arguments are `pointer`; `WGPUFuture` returns
//! are `u64`. Async entry points take their callback-info struct by address.

use gpubridge_layout::PrimitiveKind;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::fmt;

/// C signature of one native entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeSignature {
    pub name: &'static str,
    pub args: &'static [PrimitiveKind],
    /// `None` for `void`.
    pub ret: Option<PrimitiveKind>,
}

impl NativeSignature {
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Whether `args -> ret` is exactly this signature.
    pub fn matches(&self, args: &[PrimitiveKind], ret: Option<PrimitiveKind>) -> bool {
        self.args == args && self.ret == ret
    }
}

/// Renders `(a, b) -> r` the way binding diagnostics show it.
pub fn describe(args: &[PrimitiveKind], ret: Option<PrimitiveKind>) -> String {
    let args = args.iter().map(|kind| kind.name()).collect::<Vec<_>>().join(", ");
    match ret {
        Some(ret) => format!("({}) -> {}", args, ret),
        None => format!("({})", args),
    }
}

impl fmt::Display for NativeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, describe(self.args, self.ret))
    }
}

const P: PrimitiveKind = PrimitiveKind::Pointer;
const SZ: PrimitiveKind = PrimitiveKind::Size;
const U32: PrimitiveKind = PrimitiveKind::U32;
const U64: PrimitiveKind = PrimitiveKind::U64;
const F32: PrimitiveKind = PrimitiveKind::F32;
const BOOL: PrimitiveKind = PrimitiveKind::Bool;

const fn sig(name: &'static str, args: &'static [PrimitiveKind], ret: Option<PrimitiveKind>) -> NativeSignature {
    NativeSignature { name, args, ret }
}

pub static NATIVE_SIGNATURES: &[NativeSignature] = &[
    // Instance
    sig("wgpuCreateInstance", &[P], Some(P)),
    sig("wgpuInstanceProcessEvents", &[P], None),
    sig("wgpuInstanceRequestAdapter", &[P, P, P], Some(U64)),
    sig("wgpuInstanceRelease", &[P], None),
    // Adapter
    sig("wgpuAdapterRequestDevice", &[P, P, P], Some(U64)),
    sig("wgpuAdapterGetLimits", &[P, P], Some(U32)),
    sig("wgpuAdapterHasFeature", &[P, U32], Some(BOOL)),
    sig("wgpuAdapterRelease", &[P], None),
    // Device
    sig("wgpuDeviceGetQueue", &[P], Some(P)),
    sig("wgpuDeviceGetLimits", &[P, P], Some(U32)),
    sig("wgpuDeviceHasFeature", &[P, U32], Some(BOOL)),
    sig("wgpuDeviceCreateBuffer", &[P, P], Some(P)),
    sig("wgpuDeviceCreateTexture", &[P, P], Some(P)),
    sig("wgpuDeviceCreateSampler", &[P, P], Some(P)),
    sig("wgpuDeviceCreateShaderModule", &[P, P], Some(P)),
    sig("wgpuDeviceCreateBindGroupLayout", &[P, P], Some(P)),
    sig("wgpuDeviceCreateBindGroup", &[P, P], Some(P)),
    sig("wgpuDeviceCreatePipelineLayout", &[P, P], Some(P)),
    sig("wgpuDeviceCreateComputePipeline", &[P, P], Some(P)),
    sig("wgpuDeviceCreateComputePipelineAsync", &[P, P, P], Some(U64)),
    sig("wgpuDeviceCreateRenderPipeline", &[P, P], Some(P)),
    sig("wgpuDeviceCreateRenderPipelineAsync", &[P, P, P], Some(U64)),
    sig("wgpuDeviceCreateCommandEncoder", &[P, P], Some(P)),
    sig("wgpuDevicePushErrorScope", &[P, U32], None),
    sig("wgpuDevicePopErrorScope", &[P, P], Some(U64)),
    sig("wgpuDeviceDestroy", &[P], None),
    sig("wgpuDeviceRelease", &[P], None),
    // Queue
    sig("wgpuQueueSubmit", &[P, SZ, P], None),
    sig("wgpuQueueWriteBuffer", &[P, P, U64, P, SZ], None),
    sig("wgpuQueueOnSubmittedWorkDone", &[P, P], Some(U64)),
    sig("wgpuQueueRelease", &[P], None),
    // Buffer
    sig("wgpuBufferMapAsync", &[P, U64, SZ, SZ, P], Some(U64)),
    sig("wgpuBufferGetMappedRange", &[P, SZ, SZ], Some(P)),
    sig("wgpuBufferGetConstMappedRange", &[P, SZ, SZ], Some(P)),
    sig("wgpuBufferGetSize", &[P], Some(U64)),
    sig("wgpuBufferUnmap", &[P], None),
    sig("wgpuBufferDestroy", &[P], None),
    sig("wgpuBufferRelease", &[P], None),
    // Shader module
    sig("wgpuShaderModuleGetCompilationInfo", &[P, P], Some(U64)),
    sig("wgpuShaderModuleRelease", &[P], None),
    // Pipelines and bindings
    sig("wgpuComputePipelineGetBindGroupLayout", &[P, U32], Some(P)),
    sig("wgpuComputePipelineRelease", &[P], None),
    sig("wgpuRenderPipelineGetBindGroupLayout", &[P, U32], Some(P)),
    sig("wgpuRenderPipelineRelease", &[P], None),
    sig("wgpuBindGroupLayoutRelease", &[P], None),
    sig("wgpuBindGroupRelease", &[P], None),
    sig("wgpuPipelineLayoutRelease", &[P], None),
    sig("wgpuTextureCreateView", &[P, P], Some(P)),
    sig("wgpuTextureDestroy", &[P], None),
    sig("wgpuTextureRelease", &[P], None),
    sig("wgpuTextureViewRelease", &[P], None),
    sig("wgpuSamplerRelease", &[P], None),
    // Command encoding
    sig("wgpuCommandEncoderBeginComputePass", &[P, P], Some(P)),
    sig("wgpuCommandEncoderBeginRenderPass", &[P, P], Some(P)),
    sig("wgpuCommandEncoderCopyBufferToBuffer", &[P, P, U64, P, U64, U64], None),
    sig("wgpuCommandEncoderFinish", &[P, P], Some(P)),
    sig("wgpuCommandEncoderRelease", &[P], None),
    sig("wgpuCommandBufferRelease", &[P], None),
    sig("wgpuComputePassEncoderSetPipeline", &[P, P], None),
    sig("wgpuComputePassEncoderSetBindGroup", &[P, U32, P, SZ, P], None),
    sig("wgpuComputePassEncoderDispatchWorkgroups", &[P, U32, U32, U32], None),
    sig("wgpuComputePassEncoderEnd", &[P], None),
    sig("wgpuComputePassEncoderRelease", &[P], None),
    sig("wgpuRenderPassEncoderSetPipeline", &[P, P], None),
    sig("wgpuRenderPassEncoderSetBindGroup", &[P, U32, P, SZ, P], None),
    sig("wgpuRenderPassEncoderSetVertexBuffer", &[P, U32, P, U64, U64], None),
    sig("wgpuRenderPassEncoderSetViewport", &[P, F32, F32, F32, F32, F32, F32], None),
    sig("wgpuRenderPassEncoderDraw", &[P, U32, U32, U32, U32], None),
    sig("wgpuRenderPassEncoderEnd", &[P], None),
    sig("wgpuRenderPassEncoderRelease", &[P], None),
];

static INDEX: Lazy<FxHashMap<&'static str, &'static NativeSignature>> =
    Lazy::new(|| NATIVE_SIGNATURES.iter().map(|sig| (sig.name, sig)).collect());

/// Looks up the declared signature of `name`.
pub fn signature(name: &str) -> Option<&'static NativeSignature> {
    INDEX.get(name).copied()
}
