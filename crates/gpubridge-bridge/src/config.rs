use crate::BridgeError;
use gpubridge_native::abi::CallbackMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Polling and callback settings for a [`CallbackBridge`](crate::CallbackBridge).
///
/// ```toml
/// max_poll_iterations = 5000
/// poll_interval_ms = 1
/// callback_mode = "allow_process_events"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Poll iterations before a wait gives up with a timeout.
    pub max_poll_iterations: u32,
    /// Delay between poll iterations.
    pub poll_interval_ms: u64,
    /// Mode written into every callback-info descriptor.
    pub callback_mode: CallbackMode,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_poll_iterations: 5000,
            poll_interval_ms: 1,
            callback_mode: CallbackMode::AllowProcessEvents,
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, BridgeError> {
        Ok(toml::from_str(source)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Upper bound on how long a single wait can take.
    pub fn wait_budget(&self) -> Duration {
        self.poll_interval() * self.max_poll_iterations
    }
}
