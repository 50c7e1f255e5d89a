use crate::{EncodeError, NativeAddress};
use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::slice;

/// An owned, zero-initialized, aligned byte region handed to native code.
///
/// The region is allocated once and never moves; moving the `EncodedBuffer`
/// value moves only the owner. `address()` stays valid exactly as long as
/// this value is alive, which is what ties native pointer lifetimes to Rust
/// ownership.
pub struct EncodedBuffer {
    ptr: NonNull<u8>,
    len: usize,
    align: usize,
}

// SAFETY: the buffer exclusively owns its allocation, like a Box<[u8]>.
unsafe impl Send for EncodedBuffer {}
unsafe impl Sync for EncodedBuffer {}

impl EncodedBuffer {
    /// Allocates `len` zeroed bytes aligned to `align`.
    ///
    /// Zero-sized requests get a dangling, aligned address and no allocation,
    /// matching what the global allocator does for zero-sized types.
    pub fn zeroed(len: usize, align: usize) -> Result<Self, EncodeError> {
        let layout = Layout::from_size_align(len, align)
            .map_err(|_| EncodeError::InvalidAllocation { size: len, align })?;

        if len == 0 {
            let ptr = NonNull::new(align as *mut u8).ok_or(EncodeError::InvalidAllocation { size: len, align })?;
            return Ok(EncodedBuffer { ptr, len, align });
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        };
        Ok(EncodedBuffer { ptr, len, align })
    }

    /// Allocates a buffer holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8], align: usize) -> Result<Self, EncodeError> {
        let mut buffer = Self::zeroed(bytes.len(), align)?;
        buffer.as_mut_bytes().copy_from_slice(bytes);
        Ok(buffer)
    }

    /// The address native code should be given. Null-free even when empty.
    pub fn address(&self) -> NativeAddress {
        NativeAddress::from_mut_ptr(self.ptr.as_ptr())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn align(&self) -> usize {
        self.align
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: ptr is valid for len bytes (or dangling with len 0).
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for len bytes and uniquely owned.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for EncodedBuffer {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        // SAFETY: the layout was validated at allocation time.
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.len, self.align);
            alloc::dealloc(self.ptr.as_ptr(), layout);
        }
    }
}

impl fmt::Debug for EncodedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedBuffer")
            .field("address", &self.address())
            .field("len", &self.len)
            .field("align", &self.align)
            .finish()
    }
}
