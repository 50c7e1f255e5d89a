use std::ffi::c_void;
use std::fmt;

/// A raw address as seen by the native side.
///
/// Carried as an address-sized integer so it can cross API boundaries and be
/// stored in encoded structs without pretending to be a live Rust reference.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NativeAddress(usize);

impl NativeAddress {
    pub const NULL: NativeAddress = NativeAddress(0);

    pub const fn new(raw: usize) -> Self {
        NativeAddress(raw)
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        NativeAddress(ptr as usize)
    }

    pub fn from_mut_ptr<T>(ptr: *mut T) -> Self {
        NativeAddress(ptr as usize)
    }

    pub const fn get(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    pub fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    pub fn as_void(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    /// The address `bytes` past this one.
    pub const fn offset(self, bytes: usize) -> Self {
        NativeAddress(self.0 + bytes)
    }
}

impl fmt::Debug for NativeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeAddress({:#x})", self.0)
    }
}

impl fmt::Display for NativeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<usize> for NativeAddress {
    fn from(raw: usize) -> Self {
        NativeAddress(raw)
    }
}

impl From<NativeAddress> for usize {
    fn from(addr: NativeAddress) -> Self {
        addr.0
    }
}
