use std::fmt;

/// The native callback shapes the bridge knows how to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    RequestAdapter,
    RequestDevice,
    BufferMap,
    QueueWorkDone,
    PopErrorScope,
    CreateComputePipeline,
    CreateRenderPipeline,
    CompilationInfo,
    DeviceLost,
}

impl CallbackKind {
    pub const ALL: [CallbackKind; 9] = [
        CallbackKind::RequestAdapter,
        CallbackKind::RequestDevice,
        CallbackKind::BufferMap,
        CallbackKind::QueueWorkDone,
        CallbackKind::PopErrorScope,
        CallbackKind::CreateComputePipeline,
        CallbackKind::CreateRenderPipeline,
        CallbackKind::CompilationInfo,
        CallbackKind::DeviceLost,
    ];

    /// Operation name used in fallback failure messages.
    pub fn operation(self) -> &'static str {
        match self {
            CallbackKind::RequestAdapter => "requestAdapter",
            CallbackKind::RequestDevice => "requestDevice",
            CallbackKind::BufferMap => "mapAsync",
            CallbackKind::QueueWorkDone => "onSubmittedWorkDone",
            CallbackKind::PopErrorScope => "popErrorScope",
            CallbackKind::CreateComputePipeline => "createComputePipelineAsync",
            CallbackKind::CreateRenderPipeline => "createRenderPipelineAsync",
            CallbackKind::CompilationInfo => "getCompilationInfo",
            CallbackKind::DeviceLost => "deviceLost",
        }
    }

    /// Message used when the native side rejects without one.
    pub fn fallback_message(self, status: u32) -> String {
        format!("{} failed with status {}", self.operation(), status)
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}
