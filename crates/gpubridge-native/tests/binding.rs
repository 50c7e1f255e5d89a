use gpubridge_marshal::NativeAddress;
use gpubridge_native::abi::{MAP_MODE_READ, MAP_MODE_WRITE};
use gpubridge_native::{
    check_handle, CallError, EventPump, NativeEventPump, NativeLibrary, NATIVE_SIGNATURES,
};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

// --- Stub native library ---

static PROCESSED: AtomicUsize = AtomicUsize::new(0);
static LAST_INSTANCE: AtomicUsize = AtomicUsize::new(0);
static LAST_MAP_MODE: AtomicU64 = AtomicU64::new(0);

unsafe extern "C" fn stub_process_events(instance: NativeAddress) {
    LAST_INSTANCE.store(instance.get(), Ordering::SeqCst);
    PROCESSED.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn stub_create_buffer(device: NativeAddress, descriptor: NativeAddress) -> NativeAddress {
    if descriptor.is_null() {
        NativeAddress::NULL
    } else {
        device.offset(0x100)
    }
}

unsafe extern "C" fn stub_buffer_get_size(_buffer: NativeAddress) -> u64 {
    256
}

unsafe extern "C" fn stub_buffer_map_async(
    _buffer: NativeAddress,
    mode: u64,
    _offset: usize,
    _size: usize,
    _callback_info: NativeAddress,
) -> u64 {
    LAST_MAP_MODE.store(mode, Ordering::SeqCst);
    7
}

unsafe extern "C" fn stub_unused() {}

fn stub_resolver(name: &str) -> Option<NativeAddress> {
    let addr = match name {
        "wgpuInstanceProcessEvents" => stub_process_events as usize,
        "wgpuDeviceCreateBuffer" => stub_create_buffer as usize,
        "wgpuBufferGetSize" => stub_buffer_get_size as usize,
        "wgpuBufferMapAsync" => stub_buffer_map_async as usize,
        _ => stub_unused as usize,
    };
    Some(NativeAddress::new(addr))
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn bind_stub() -> NativeLibrary {
    init_logging();
    unsafe { NativeLibrary::bind(&stub_resolver) }.unwrap()
}

// --- Tests ---

#[test]
fn test_bind_resolves_whole_table() {
    let library = bind_stub();
    assert_eq!(library.len(), NATIVE_SIGNATURES.len());
    assert_eq!(
        library.address("wgpuBufferGetSize").unwrap(),
        NativeAddress::new(stub_buffer_get_size as usize)
    );
}

#[test]
fn test_typed_call_through_binding() {
    let library = bind_stub();
    let create = library
        .get::<unsafe extern "C" fn(NativeAddress, NativeAddress) -> NativeAddress>("wgpuDeviceCreateBuffer")
        .unwrap();
    let device = NativeAddress::new(0x4000);

    let buffer = unsafe { create(device, NativeAddress::new(0x10)) };
    assert_eq!(check_handle("wgpuDeviceCreateBuffer", buffer).unwrap(), NativeAddress::new(0x4100));

    let failed = unsafe { create(device, NativeAddress::NULL) };
    let err = check_handle("wgpuDeviceCreateBuffer", failed).unwrap_err();
    assert!(matches!(err, CallError::NullHandle { .. }));

    let size = library
        .get::<unsafe extern "C" fn(NativeAddress) -> u64>("wgpuBufferGetSize")
        .unwrap();
    assert_eq!(unsafe { size(buffer) }, 256);
}

#[test]
fn test_map_async_passes_mode_flags() {
    let library = bind_stub();
    let map_async = library
        .get::<unsafe extern "C" fn(NativeAddress, u64, usize, usize, NativeAddress) -> u64>("wgpuBufferMapAsync")
        .unwrap();

    let future = unsafe {
        map_async(
            NativeAddress::new(0x4100),
            MAP_MODE_READ | MAP_MODE_WRITE,
            0,
            256,
            NativeAddress::new(0x9000),
        )
    };
    assert_eq!(future, 7);
    assert_eq!(LAST_MAP_MODE.load(Ordering::SeqCst), 0x3);
}

#[test]
fn test_signature_mismatch_is_caught_at_bind_time() {
    let library = bind_stub();
    let err = library
        .get::<unsafe extern "C" fn(NativeAddress) -> u32>("wgpuInstanceProcessEvents")
        .unwrap_err();
    match err {
        CallError::SignatureMismatch { symbol, expected, found } => {
            assert_eq!(symbol, "wgpuInstanceProcessEvents");
            assert_eq!(expected, "(pointer)");
            assert_eq!(found, "(pointer) -> u32");
        }
        other => panic!("unexpected error {:?}", other),
    }

    let err = library
        .get::<unsafe extern "C" fn(NativeAddress, u64, u64, u64, NativeAddress) -> u64>("wgpuBufferMapAsync")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Binding for `wgpuBufferMapAsync` has signature (pointer, u64, u64, u64, pointer) -> u64, \
         but the library declares (pointer, u64, size, size, pointer) -> u64"
    );

    let err = library.get::<unsafe extern "C" fn()>("wgpuNotDeclared").unwrap_err();
    assert!(matches!(err, CallError::UnknownSymbol(ref name) if name == "wgpuNotDeclared"));
}

#[test]
fn test_event_pump_calls_process_events() {
    let library = bind_stub();
    let instance = NativeAddress::new(0x9000);
    let pump = NativeEventPump::new(&library, instance).unwrap();

    let before = PROCESSED.load(Ordering::SeqCst);
    pump.process_events();
    pump.process_events();
    assert!(PROCESSED.load(Ordering::SeqCst) >= before + 2);
    assert_eq!(LAST_INSTANCE.load(Ordering::SeqCst), 0x9000);

    let err = NativeEventPump::new(&library, NativeAddress::NULL).unwrap_err();
    assert!(matches!(err, CallError::NullHandle { .. }));
}
