//! `extern "C"` entry points the native library calls back into.
//!
//! A native callback can only carry integers, so each descriptor holds the
//! bridge id in `userdata1` and the token in `userdata2`. Trampolines look the
//! bridge up in the process-wide route table, which only holds weak
//! references; a bridge that has been dropped simply stops receiving.

use crate::bridge::{BridgeShared, Outcome};
use crate::payload::decode_compilation_info;
use crate::{BridgeError, BridgeId, CallbackKind, CallbackPayload, CallbackToken};
use gpubridge_marshal::{DecodeError, NativeAddress};
use gpubridge_native::abi::{DeviceLostReason, ErrorType, RawStringView, STATUS_SUCCESS};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

static ROUTES: Lazy<RwLock<FxHashMap<BridgeId, Weak<BridgeShared>>>> = Lazy::new(Default::default);

pub(crate) fn register_route(shared: &Arc<BridgeShared>) {
    ROUTES.write().insert(shared.id(), Arc::downgrade(shared));
}

pub(crate) fn unregister_route(id: BridgeId) {
    ROUTES.write().remove(&id);
}

/// Number of bridges currently reachable from native callbacks.
pub fn live_routes() -> usize {
    ROUTES.read().values().filter(|shared| shared.strong_count() > 0).count()
}

/// Hands `outcome` to the bridge and token named by the user data.
fn deliver(userdata1: NativeAddress, userdata2: NativeAddress, outcome: impl FnOnce() -> Outcome) {
    let id = BridgeId::from_userdata(userdata1);
    let token = CallbackToken::from_userdata(userdata2);

    let shared = ROUTES.read().get(&id).and_then(Weak::upgrade);
    let Some(shared) = shared else {
        log::debug!("ignoring callback for {} ({}): no such bridge", token, id);
        return;
    };

    // Unwinding across the C boundary aborts; contain any panic here.
    let result = panic::catch_unwind(AssertUnwindSafe(|| shared.resolve(token, outcome())));
    if result.is_err() {
        log::error!("{}: panic while completing {}", id, token);
    }
}

/// Maps a status and message to an outcome. `payload` runs only on success.
///
/// # Safety
/// `message` must be readable for the duration of the callback.
unsafe fn complete(
    kind: CallbackKind,
    status: u32,
    message: RawStringView,
    payload: impl FnOnce() -> Result<CallbackPayload, DecodeError>,
) -> Outcome {
    if status == STATUS_SUCCESS {
        return payload().map_err(BridgeError::from);
    }
    let message = match message.to_text() {
        Ok(Some(text)) if !text.is_empty() => text,
        _ => kind.fallback_message(status),
    };
    Err(BridgeError::Rejected { kind, status, message })
}

/// A successful creation must hand back a live object.
fn handle_payload(handle: NativeAddress, what: &'static str) -> Result<CallbackPayload, DecodeError> {
    if handle.is_null() {
        return Err(DecodeError::NullPointer { what });
    }
    Ok(CallbackPayload::Handle(handle))
}

unsafe extern "C" fn request_adapter(
    status: u32,
    adapter: NativeAddress,
    message: RawStringView,
    userdata1: NativeAddress,
    userdata2: NativeAddress,
) {
    deliver(userdata1, userdata2, || {
        complete(CallbackKind::RequestAdapter, status, message, || handle_payload(adapter, "adapter handle"))
    })
}

unsafe extern "C" fn request_device(
    status: u32,
    device: NativeAddress,
    message: RawStringView,
    userdata1: NativeAddress,
    userdata2: NativeAddress,
) {
    deliver(userdata1, userdata2, || {
        complete(CallbackKind::RequestDevice, status, message, || handle_payload(device, "device handle"))
    })
}

unsafe extern "C" fn buffer_map(status: u32, message: RawStringView, userdata1: NativeAddress, userdata2: NativeAddress) {
    deliver(userdata1, userdata2, || {
        complete(CallbackKind::BufferMap, status, message, || Ok(CallbackPayload::Unit))
    })
}

unsafe extern "C" fn queue_work_done(status: u32, userdata1: NativeAddress, userdata2: NativeAddress) {
    deliver(userdata1, userdata2, || {
        complete(CallbackKind::QueueWorkDone, status, RawStringView::NULL, || Ok(CallbackPayload::Unit))
    })
}

unsafe extern "C" fn pop_error_scope(
    status: u32,
    error_type: u32,
    message: RawStringView,
    userdata1: NativeAddress,
    userdata2: NativeAddress,
) {
    deliver(userdata1, userdata2, || {
        complete(CallbackKind::PopErrorScope, status, message, || {
            Ok(CallbackPayload::ErrorScope {
                error_type: ErrorType::from_raw(error_type),
                message: message.to_text()?,
            })
        })
    })
}

unsafe extern "C" fn create_compute_pipeline(
    status: u32,
    pipeline: NativeAddress,
    message: RawStringView,
    userdata1: NativeAddress,
    userdata2: NativeAddress,
) {
    deliver(userdata1, userdata2, || {
        complete(CallbackKind::CreateComputePipeline, status, message, || {
            handle_payload(pipeline, "compute pipeline handle")
        })
    })
}

unsafe extern "C" fn create_render_pipeline(
    status: u32,
    pipeline: NativeAddress,
    message: RawStringView,
    userdata1: NativeAddress,
    userdata2: NativeAddress,
) {
    deliver(userdata1, userdata2, || {
        complete(CallbackKind::CreateRenderPipeline, status, message, || {
            handle_payload(pipeline, "render pipeline handle")
        })
    })
}

unsafe extern "C" fn compilation_info(status: u32, info: NativeAddress, userdata1: NativeAddress, userdata2: NativeAddress) {
    deliver(userdata1, userdata2, || {
        complete(CallbackKind::CompilationInfo, status, RawStringView::NULL, || {
            decode_compilation_info(info).map(CallbackPayload::Compilation)
        })
    })
}

/// Device loss always resolves; the reason says why.
unsafe extern "C" fn device_lost(
    _device: *const NativeAddress,
    reason: u32,
    message: RawStringView,
    userdata1: NativeAddress,
    userdata2: NativeAddress,
) {
    deliver(userdata1, userdata2, || {
        message
            .to_text()
            .map(|message| CallbackPayload::DeviceLost {
                reason: DeviceLostReason::from_raw(reason),
                message,
            })
            .map_err(BridgeError::from)
    })
}

type StatusHandleCallback = unsafe extern "C" fn(u32, NativeAddress, RawStringView, NativeAddress, NativeAddress);
type StatusCallback = unsafe extern "C" fn(u32, RawStringView, NativeAddress, NativeAddress);
type StatusOnlyCallback = unsafe extern "C" fn(u32, NativeAddress, NativeAddress);
type ErrorScopeCallback = unsafe extern "C" fn(u32, u32, RawStringView, NativeAddress, NativeAddress);
type CompilationCallback = unsafe extern "C" fn(u32, NativeAddress, NativeAddress, NativeAddress);
type DeviceLostCallback = unsafe extern "C" fn(*const NativeAddress, u32, RawStringView, NativeAddress, NativeAddress);

/// Address of the trampoline whose C signature matches what the native
/// library invokes for `kind`.
pub fn trampoline_for(kind: CallbackKind) -> NativeAddress {
    let addr = match kind {
        CallbackKind::RequestAdapter => request_adapter as StatusHandleCallback as usize,
        CallbackKind::RequestDevice => request_device as StatusHandleCallback as usize,
        CallbackKind::BufferMap => buffer_map as StatusCallback as usize,
        CallbackKind::QueueWorkDone => queue_work_done as StatusOnlyCallback as usize,
        CallbackKind::PopErrorScope => pop_error_scope as ErrorScopeCallback as usize,
        CallbackKind::CreateComputePipeline => create_compute_pipeline as StatusHandleCallback as usize,
        CallbackKind::CreateRenderPipeline => create_render_pipeline as StatusHandleCallback as usize,
        CallbackKind::CompilationInfo => compilation_info as CompilationCallback as usize,
        CallbackKind::DeviceLost => device_lost as DeviceLostCallback as usize,
    };
    NativeAddress::new(addr)
}
