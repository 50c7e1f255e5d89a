use crate::encoder::{build_cstring, build_string_view, StringViewRef};
use crate::{EncodeError, EncodedBuffer, NativeAddress, StructEncoder};
use rustc_hash::FxHashMap;

/// Buffers whose lifetime is tied to a native object rather than a call.
///
/// Some native objects keep reading memory they were given at creation (a
/// label, an entry-point name). Those buffers are registered under the
/// owning handle and released together when the handle is destroyed.
#[derive(Debug, Default)]
pub struct PinnedAllocations {
    owners: FxHashMap<NativeAddress, Vec<EncodedBuffer>>,
}

impl PinnedAllocations {
    pub fn new() -> Self {
        Self::default()
    }

    fn pin(&mut self, owner: NativeAddress, buffer: EncodedBuffer) -> NativeAddress {
        let addr = buffer.address();
        self.owners.entry(owner).or_default().push(buffer);
        addr
    }

    /// Encodes a string view whose memory lives until `owner` is released.
    pub fn pin_string(&mut self, owner: NativeAddress, text: &str) -> Result<StringViewRef, EncodeError> {
        let (data, descriptor, view) = build_string_view(text)?;
        if let Some(data) = data {
            self.pin(owner, data);
        }
        self.pin(owner, descriptor);
        Ok(view)
    }

    /// Encodes a NUL-terminated string pinned to `owner`.
    pub fn pin_cstring(&mut self, owner: NativeAddress, text: &str) -> Result<NativeAddress, EncodeError> {
        let buffer = build_cstring(text)?;
        Ok(self.pin(owner, buffer))
    }

    pub fn pin_bytes(&mut self, owner: NativeAddress, bytes: &[u8], align: usize) -> Result<NativeAddress, EncodeError> {
        let buffer = EncodedBuffer::from_bytes(bytes, align)?;
        Ok(self.pin(owner, buffer))
    }

    /// Takes over every buffer an encoder still retains, so the addresses it
    /// handed out stay valid for as long as `owner` lives.
    pub fn adopt(&mut self, owner: NativeAddress, encoder: &mut StructEncoder) -> usize {
        let buffers = encoder.take_retained();
        let count = buffers.len();
        if count > 0 {
            self.owners.entry(owner).or_default().extend(buffers);
        }
        count
    }

    /// Frees everything pinned to `owner`. Returns how many buffers went.
    pub fn release(&mut self, owner: NativeAddress) -> usize {
        match self.owners.remove(&owner) {
            Some(buffers) => {
                log::debug!("released {} pinned buffers for {}", buffers.len(), owner);
                buffers.len()
            }
            None => 0,
        }
    }

    pub fn release_all(&mut self) -> usize {
        let count = self.pinned_count();
        self.owners.clear();
        count
    }

    pub fn pinned_count(&self) -> usize {
        self.owners.values().map(Vec::len).sum()
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn is_pinned(&self, owner: NativeAddress) -> bool {
        self.owners.contains_key(&owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADER: NativeAddress = NativeAddress::new(0x5000);
    const PIPELINE: NativeAddress = NativeAddress::new(0x6000);

    #[test]
    fn release_is_per_owner() {
        let mut pinned = PinnedAllocations::new();
        let view = pinned.pin_string(SHADER, "shader label").unwrap();
        pinned.pin_cstring(PIPELINE, "main").unwrap();
        assert_eq!(view.length, 12);
        assert_eq!(pinned.pinned_count(), 3);

        assert_eq!(pinned.release(SHADER), 2);
        assert!(!pinned.is_pinned(SHADER));
        assert!(pinned.is_pinned(PIPELINE));
        assert_eq!(pinned.release(SHADER), 0);
        assert_eq!(pinned.release_all(), 1);
    }

    #[test]
    fn adopt_moves_encoder_buffers() {
        let mut encoder = StructEncoder::new();
        let label = encoder.encode_string("pass").unwrap();
        let mut pinned = PinnedAllocations::new();

        assert_eq!(pinned.adopt(PIPELINE, &mut encoder), 2);
        assert_eq!(encoder.retained_count(), 0);
        assert_eq!(encoder.release_all(), 0);

        // Memory is still owned, now by the pinned set.
        let text = unsafe { crate::read_string_view(label.descriptor) }.unwrap();
        assert_eq!(text.as_deref(), Some("pass"));
        assert_eq!(pinned.owner_count(), 1);
    }

    #[test]
    fn pinned_bytes_keep_alignment_and_contents() {
        let mut pinned = PinnedAllocations::new();
        let spirv = [0x03, 0x02, 0x23, 0x07, 0x00, 0x00, 0x01, 0x00];
        let addr = pinned.pin_bytes(SHADER, &spirv, 4).unwrap();

        assert_eq!(addr.get() % 4, 0);
        let view = unsafe { crate::NativeView::from_raw(addr, spirv.len()) }.unwrap();
        assert_eq!(view.bytes(), &spirv[..]);
        assert_eq!(pinned.release(SHADER), 1);
    }
}
