use crate::trampoline::{self, trampoline_for};
use crate::token::Counter;
use crate::{BridgeConfig, BridgeError, BridgeId, CallbackKind, CallbackPayload, CallbackToken};
use crossbeam_queue::SegQueue;
use futures::channel::oneshot;
use gpubridge_marshal::{encode_to_buffer, EncodedBuffer, FieldValues, NativeAddress, Value};
use gpubridge_native::abi;
use gpubridge_native::EventPump;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

pub(crate) type Outcome = Result<CallbackPayload, BridgeError>;

static NEXT_BRIDGE_ID: Counter = Counter::new();

/// One registered operation waiting for its native callback.
#[derive(Debug)]
struct PendingEntry {
    kind: CallbackKind,
    sender: oneshot::Sender<Outcome>,
    /// The callback-info descriptor the native side was handed.
    descriptor: EncodedBuffer,
}

/// State shared between a bridge and the trampolines that route to it.
#[derive(Debug)]
pub(crate) struct BridgeShared {
    id: BridgeId,
    tokens: Counter,
    pending: Mutex<FxHashMap<CallbackToken, PendingEntry>>,
    /// Descriptors whose callback already fired. Freed outside callbacks.
    retired: SegQueue<EncodedBuffer>,
}

impl BridgeShared {
    pub(crate) fn id(&self) -> BridgeId {
        self.id
    }

    /// Completes `token` with `outcome`. Called from trampolines, possibly on
    /// a driver thread, possibly more than once for the same token.
    pub(crate) fn resolve(&self, token: CallbackToken, outcome: Outcome) {
        let entry = self.pending.lock().remove(&token);
        let Some(entry) = entry else {
            log::debug!("{}: ignoring callback for unknown {}", self.id, token);
            return;
        };
        self.retired.push(entry.descriptor);

        match &outcome {
            Ok(_) => log::debug!("{}: {} ({}) resolved", self.id, token, entry.kind),
            Err(err) => log::debug!("{}: {} ({}) rejected: {}", self.id, token, entry.kind, err),
        }
        if entry.sender.send(outcome).is_err() {
            log::debug!("{}: nobody is waiting on {} any more", self.id, token);
        }
    }

    fn release_retired(&self) -> usize {
        let mut released = 0;
        while self.retired.pop().is_some() {
            released += 1;
        }
        released
    }

    /// Removes `token` without resolving it. Its descriptor joins the retired
    /// queue and is freed at the next registration, poll iteration or cleanup.
    fn forget(&self, token: CallbackToken) -> bool {
        let entry = self.pending.lock().remove(&token);
        match entry {
            Some(entry) => {
                self.retired.push(entry.descriptor);
                true
            }
            None => false,
        }
    }
}

/// A registered async operation. Await it directly, or hand it to
/// [`CallbackBridge::wait`] to drive the event pump until it completes.
#[derive(Debug)]
#[must_use = "a pending operation does nothing unless waited on"]
pub struct PendingOperation {
    token: CallbackToken,
    kind: CallbackKind,
    receiver: oneshot::Receiver<Outcome>,
}

impl PendingOperation {
    pub fn token(&self) -> CallbackToken {
        self.token
    }

    pub fn kind(&self) -> CallbackKind {
        self.kind
    }

    /// Non-blocking check. `None` while the callback has not fired.
    fn try_take(&mut self) -> Option<Outcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Some(Err(BridgeError::Shutdown)),
        }
    }
}

impl Future for PendingOperation {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(BridgeError::Shutdown)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Turns native completion callbacks into futures.
///
/// Every registration hands the native side a callback-info descriptor whose
/// user data carries this bridge's id and a fresh token. The matching
/// trampoline routes the callback back here, resolves the token exactly
/// once, and retires the descriptor.
#[derive(Debug)]
pub struct CallbackBridge {
    shared: Arc<BridgeShared>,
    config: BridgeConfig,
}

impl CallbackBridge {
    pub fn new(config: BridgeConfig) -> Self {
        let shared = Arc::new(BridgeShared {
            id: BridgeId(NEXT_BRIDGE_ID.next()),
            tokens: Counter::new(),
            pending: Mutex::new(FxHashMap::default()),
            retired: SegQueue::new(),
        });
        trampoline::register_route(&shared);
        log::debug!("{} created ({:?})", shared.id, config);
        CallbackBridge { shared, config }
    }

    pub fn id(&self) -> BridgeId {
        self.shared.id
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Registers a new async operation of `kind`.
    ///
    /// Returns the address of the callback-info descriptor to pass to the
    /// native async entry point, and the operation to wait on. The
    /// descriptor stays valid until the callback fires or the bridge is
    /// cleaned up.
    pub fn register_async(&self, kind: CallbackKind) -> Result<(NativeAddress, PendingOperation), BridgeError> {
        self.shared.release_retired();

        let token = CallbackToken(self.shared.tokens.next());
        let values = FieldValues::new()
            .with("mode", Value::U32(self.config.callback_mode.as_raw()))
            .with("callback", Value::Pointer(trampoline_for(kind)))
            .with("userdata1", Value::Pointer(self.shared.id.to_userdata()))
            .with("userdata2", Value::Pointer(token.to_userdata()));
        let descriptor = encode_to_buffer(&abi::layouts().callback_info, &values)?;
        let address = descriptor.address();

        let (sender, receiver) = oneshot::channel();
        self.shared.pending.lock().insert(token, PendingEntry { kind, sender, descriptor });
        log::trace!("{}: registered {} for {}", self.shared.id, token, kind);

        Ok((address, PendingOperation { token, kind, receiver }))
    }

    /// Pumps native events until `op` completes or the poll budget runs out.
    pub async fn wait(&self, mut op: PendingOperation, pump: &dyn EventPump) -> Outcome {
        for _ in 0..self.config.max_poll_iterations {
            pump.process_events();
            self.shared.release_retired();
            if let Some(outcome) = op.try_take() {
                return outcome;
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
        self.time_out(op)
    }

    /// [`wait`](Self::wait) for callers without an async runtime.
    pub fn wait_blocking(&self, mut op: PendingOperation, pump: &dyn EventPump) -> Outcome {
        for _ in 0..self.config.max_poll_iterations {
            pump.process_events();
            self.shared.release_retired();
            if let Some(outcome) = op.try_take() {
                return outcome;
            }
            std::thread::sleep(self.config.poll_interval());
        }
        self.time_out(op)
    }

    fn time_out(&self, mut op: PendingOperation) -> Outcome {
        if !self.shared.forget(op.token) {
            // The callback won the race against the budget.
            if let Some(outcome) = op.try_take() {
                return outcome;
            }
        }
        log::warn!(
            "{}: {} ({}) timed out after {} poll iterations",
            self.shared.id,
            op.token,
            op.kind,
            self.config.max_poll_iterations
        );
        Err(BridgeError::Timeout {
            token: op.token,
            iterations: self.config.max_poll_iterations,
        })
    }

    /// Rejects every pending operation with [`BridgeError::Shutdown`], frees
    /// every descriptor and unregisters the bridge route. Returns how many
    /// operations were rejected.
    pub fn cleanup(&self) -> usize {
        trampoline::unregister_route(self.shared.id);

        let drained: Vec<_> = self.shared.pending.lock().drain().collect();
        let rejected = drained.len();
        for (token, entry) in drained {
            log::debug!("{}: rejecting {} ({}) on shutdown", self.shared.id, token, entry.kind);
            let _ = entry.sender.send(Err(BridgeError::Shutdown));
        }
        let released = self.shared.release_retired();
        if rejected > 0 || released > 0 {
            log::info!("{} cleaned up: {} rejected, {} retired descriptors freed", self.shared.id, rejected, released);
        }
        rejected
    }
}

impl Drop for CallbackBridge {
    fn drop(&mut self) {
        self.cleanup();
    }
}
