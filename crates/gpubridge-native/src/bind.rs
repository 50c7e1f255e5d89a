use crate::signature::{describe, signature, NATIVE_SIGNATURES};
use crate::CallError;
use gpubridge_layout::PrimitiveKind;
use gpubridge_marshal::NativeAddress;
use rustc_hash::FxHashMap;
use std::ffi::c_void;

/// The library's 32-bit boolean (`WGPUBool`).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeBool(pub u32);

impl NativeBool {
    pub const FALSE: NativeBool = NativeBool(0);
    pub const TRUE: NativeBool = NativeBool(1);

    pub fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for NativeBool {
    fn from(value: bool) -> Self {
        NativeBool(value as u32)
    }
}

/// A Rust type that crosses the C boundary as one primitive kind.
pub trait NativeType: Copy {
    const KIND: PrimitiveKind;
}

/// A Rust type usable as a native return type. `()` is `void`.
pub trait NativeReturn {
    const KIND: Option<PrimitiveKind>;
}

impl NativeReturn for () {
    const KIND: Option<PrimitiveKind> = None;
}

macro_rules! impl_native_type {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl NativeType for $ty {
                const KIND: PrimitiveKind = PrimitiveKind::$kind;
            }

            impl NativeReturn for $ty {
                const KIND: Option<PrimitiveKind> = Some(PrimitiveKind::$kind);
            }
        )*
    };
}

impl_native_type! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    usize => Size,
    NativeBool => Bool,
    NativeAddress => Pointer,
    *const c_void => Pointer,
    *mut c_void => Pointer,
}

/// A typed C function pointer whose signature can be checked against the
/// native table before it is ever called.
pub trait NativeFn: Copy {
    fn arg_kinds() -> Vec<PrimitiveKind>;
    fn ret_kind() -> Option<PrimitiveKind>;

    /// Reinterprets a resolved symbol address as this function type.
    ///
    /// # Safety
    /// `addr` must be the address of a function with exactly this C signature.
    unsafe fn from_address(addr: NativeAddress) -> Self;
}

macro_rules! impl_native_fn {
    ($($arg:ident),*) => {
        impl<R: NativeReturn, $($arg: NativeType),*> NativeFn for unsafe extern "C" fn($($arg),*) -> R {
            fn arg_kinds() -> Vec<PrimitiveKind> {
                vec![$(<$arg as NativeType>::KIND),*]
            }

            fn ret_kind() -> Option<PrimitiveKind> {
                R::KIND
            }

            unsafe fn from_address(addr: NativeAddress) -> Self {
                std::mem::transmute_copy::<usize, Self>(&addr.get())
            }
        }
    };
}

impl_native_fn!();
impl_native_fn!(A);
impl_native_fn!(A, B);
impl_native_fn!(A, B, C);
impl_native_fn!(A, B, C, D);
impl_native_fn!(A, B, C, D, E);
impl_native_fn!(A, B, C, D, E, F);
impl_native_fn!(A, B, C, D, E, F, G);

/// Finds native entry points by symbol name.
///
/// Loading the shared library is up to the implementor; the core only needs
/// addresses.
pub trait SymbolResolver {
    fn resolve(&self, symbol: &str) -> Option<NativeAddress>;
}

impl<F> SymbolResolver for F
where
    F: Fn(&str) -> Option<NativeAddress>,
{
    fn resolve(&self, symbol: &str) -> Option<NativeAddress> {
        self(symbol)
    }
}

/// Every entry point of the native table, resolved to an address.
#[derive(Debug, Clone)]
pub struct NativeLibrary {
    symbols: FxHashMap<&'static str, NativeAddress>,
}

impl NativeLibrary {
    /// Resolves the whole native table up front.
    ///
    /// Fails with every missing symbol listed at once, so a mismatched library
    /// is reported in one go instead of one call at a time.
    ///
    /// # Safety
    /// Every address the resolver returns must be a function with the C
    /// signature the table declares for that name.
    pub unsafe fn bind(resolver: &dyn SymbolResolver) -> Result<Self, CallError> {
        let mut symbols = FxHashMap::default();
        let mut missing = Vec::new();

        for sig in NATIVE_SIGNATURES {
            match resolver.resolve(sig.name).filter(|addr| !addr.is_null()) {
                Some(addr) => {
                    symbols.insert(sig.name, addr);
                }
                None => missing.push(sig.name),
            }
        }

        if !missing.is_empty() {
            log::error!("native library is missing {} of {} symbols", missing.len(), NATIVE_SIGNATURES.len());
            return Err(CallError::MissingSymbols { missing });
        }
        log::info!("bound {} native symbols", symbols.len());
        Ok(NativeLibrary { symbols })
    }

    /// The resolved address of `name`.
    pub fn address(&self, name: &str) -> Result<NativeAddress, CallError> {
        self.symbols
            .get(name)
            .copied()
            .ok_or_else(|| CallError::UnknownSymbol(name.to_string()))
    }

    /// Hands out `name` as the typed function pointer `F`, after checking
    /// that `F` has exactly the declared argument and return kinds.
    pub fn get<F: NativeFn>(&self, name: &str) -> Result<F, CallError> {
        let sig = signature(name).ok_or_else(|| CallError::UnknownSymbol(name.to_string()))?;
        let args = F::arg_kinds();
        let ret = F::ret_kind();
        if !sig.matches(&args, ret) {
            return Err(CallError::SignatureMismatch {
                symbol: sig.name,
                expected: describe(sig.args, sig.ret),
                found: describe(&args, ret),
            });
        }
        let addr = self.address(name)?;
        // SAFETY: `bind` guarantees the address has the declared signature,
        // which `F` was just checked against.
        Ok(unsafe { F::from_address(addr) })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Turns a null handle returned by `symbol` into an error.
pub fn check_handle(symbol: &'static str, handle: NativeAddress) -> Result<NativeAddress, CallError> {
    if handle.is_null() {
        log::warn!("{} returned a null handle", symbol);
        Err(CallError::NullHandle { symbol })
    } else {
        Ok(handle)
    }
}
