use crate::{check_handle, CallError, NativeLibrary};
use gpubridge_marshal::NativeAddress;

/// Drives pending native completions.
///
/// Callbacks registered with `AllowProcessEvents` only fire from inside a
/// `process_events` call, so anything waiting on one must keep pumping.
pub trait EventPump: Send + Sync {
    fn process_events(&self);
}

impl<F> EventPump for F
where
    F: Fn() + Send + Sync,
{
    fn process_events(&self) {
        self()
    }
}

type ProcessEventsFn = unsafe extern "C" fn(NativeAddress);

/// Pumps one native instance through `wgpuInstanceProcessEvents`.
#[derive(Debug, Clone, Copy)]
pub struct NativeEventPump {
    process_events: ProcessEventsFn,
    instance: NativeAddress,
}

impl NativeEventPump {
    pub fn new(library: &NativeLibrary, instance: NativeAddress) -> Result<Self, CallError> {
        let instance = check_handle("wgpuCreateInstance", instance)?;
        let process_events = library.get::<ProcessEventsFn>("wgpuInstanceProcessEvents")?;
        Ok(NativeEventPump { process_events, instance })
    }

    pub fn instance(&self) -> NativeAddress {
        self.instance
    }
}

impl EventPump for NativeEventPump {
    fn process_events(&self) {
        // SAFETY: the pointer was checked against the declared signature and
        // the instance handle is non-null.
        unsafe { (self.process_events)(self.instance) }
    }
}
