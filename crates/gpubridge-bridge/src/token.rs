use gpubridge_marshal::NativeAddress;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one pending async operation within a bridge.
///
/// Crosses the native boundary as the `userdata2` integer. Never reused
/// within a bridge and never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackToken(pub u64);

/// Identifies a bridge instance in the process-wide route table.
/// Crosses the native boundary as the `userdata1` integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BridgeId(pub u64);

macro_rules! userdata_conversions {
    ($ty:ident) => {
        impl $ty {
            pub fn to_userdata(self) -> NativeAddress {
                NativeAddress::new(self.0 as usize)
            }

            pub fn from_userdata(userdata: NativeAddress) -> Self {
                $ty(userdata.get() as u64)
            }
        }
    };
}

userdata_conversions!(CallbackToken);
userdata_conversions!(BridgeId);

impl fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback #{}", self.0)
    }
}

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bridge #{}", self.0)
    }
}

/// Monotonic counter handing out ids starting at 1.
#[derive(Debug)]
pub(crate) struct Counter(AtomicU64);

impl Counter {
    pub(crate) const fn new() -> Self {
        Counter(AtomicU64::new(1))
    }

    pub(crate) fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}
