//! The update bridge: capture, coalesce, flush, apply.
//!
//! Outbound flow: document mutation -> observer event -> origin filter ->
//! outbound buffer -> dispatch policy -> merge + encode -> channel send.
//! Inbound flow: channel delivery -> decode -> apply under the reserved
//! origin. The reserved origin keeps replayed applications out of the
//! capture path, which is what prevents echo loops; duplicate deliveries are
//! absorbed by the document's idempotent merge.

use crate::channel::{InboundEvent, RestoreState, UpdateChannel};
use crate::config::BridgeConfig;
use crate::dispatch::FlushHandle;
use crate::error::{BridgeError, Result};
use dsb_core::{Delta, DeltaDocument};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct BridgeInner<D: DeltaDocument, C: UpdateChannel> {
    document: Arc<RwLock<D>>,
    channel: Arc<C>,
    config: BridgeConfig,
    /// Not-yet-transmitted foreign deltas, in capture order.
    buffer: Mutex<Vec<Delta>>,
}

impl<D: DeltaDocument, C: UpdateChannel> BridgeInner<D, C> {
    fn apply_incoming(&self, payload: &Value) -> Result<()> {
        let delta = self.config.codec.decode(payload)?;
        self.document
            .write()
            .apply_update(&delta, self.config.reserved_origin.clone())?;
        Ok(())
    }

    /// Atomically swap the buffer for an empty one. A capture arriving after
    /// the swap starts a new buffer epoch.
    fn drain(&self) -> Vec<Delta> {
        std::mem::take(&mut *self.buffer.lock())
    }

    /// Put drained deltas back, ahead of anything captured since, preserving
    /// capture order.
    fn restore(&self, mut drained: Vec<Delta>) {
        let mut buffer = self.buffer.lock();
        drained.append(&mut buffer);
        *buffer = drained;
    }

    fn merge_and_encode(&self, drained: &[Delta]) -> Result<Value> {
        let combined = D::merge_updates(drained)?;
        Ok(self.config.codec.encode(&combined)?)
    }

    async fn flush(&self) -> Result<()> {
        let drained = self.drain();
        if drained.is_empty() {
            return Ok(());
        }
        // Validate mergeability/encodability before anything irreversible:
        // on failure the deltas go straight back into the buffer.
        let payload = match self.merge_and_encode(&drained) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(deltas = drained.len(), %err, "flush aborted, buffer retained");
                self.restore(drained);
                return Err(err);
            }
        };
        match self
            .channel
            .send_update(payload, &self.config.update_descr)
            .await
        {
            Ok(()) => {
                debug!(deltas = drained.len(), "flushed outbound updates");
                Ok(())
            }
            Err(err) => {
                warn!(deltas = drained.len(), %err, "send failed, buffer retained");
                self.restore(drained);
                Err(BridgeError::Channel(err))
            }
        }
    }
}

/// Bridges one CRDT-backed document to one host update channel.
///
/// Dropping the bridge cancels its observer and listener tasks and any
/// pending scheduled flush. Buffered updates are NOT flushed on drop; callers
/// that care about them must run [`flush_now`](Self::flush_now) first.
pub struct UpdateBridge<D: DeltaDocument, C: UpdateChannel> {
    inner: Arc<BridgeInner<D, C>>,
    restored: RestoreState,
    tasks: Vec<JoinHandle<()>>,
}

impl<D: DeltaDocument, C: UpdateChannel> UpdateBridge<D, C> {
    /// Wire a document to a channel and begin capturing.
    ///
    /// Registers a mutation observer on `document` and an inbound listener on
    /// `channel`. From this point every foreign-origin delta is buffered for
    /// transmission, and every delivered update is applied under the reserved
    /// origin. Must be called from within a tokio runtime.
    pub fn initialize(document: Arc<RwLock<D>>, channel: Arc<C>, config: BridgeConfig) -> Self {
        let mut events = document.read().observe_updates();
        let mut inbound = channel.subscribe();
        let (restored_tx, restored) = RestoreState::pair();

        let inner = Arc::new(BridgeInner {
            document,
            channel,
            config,
            buffer: Mutex::new(Vec::new()),
        });

        let flush_handle = Self::flush_handle(&inner);

        // Capture task: buffer every foreign delta, discard reserved-origin
        // echoes, and let the dispatch policy decide the flush timing.
        let capture_inner = Arc::clone(&inner);
        let capture = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if event.origin == capture_inner.config.reserved_origin {
                            continue;
                        }
                        let buffered = {
                            let mut buffer = capture_inner.buffer.lock();
                            buffer.push(event.delta);
                            buffer.len()
                        };
                        debug!(origin = %event.origin, buffered, "captured local delta");
                        capture_inner
                            .config
                            .dispatch
                            .on_capture(flush_handle.clone());
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "document observer lagged, deltas were dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        // Listener task: apply every delivered update under the reserved
        // origin; resolve the restore signal once the stored log has been
        // replayed. An undecodable message is dropped, not fatal.
        let listener_inner = Arc::clone(&inner);
        let listener = tokio::spawn(async move {
            while let Some(event) = inbound.recv().await {
                match event {
                    InboundEvent::Update(update) => {
                        match listener_inner.apply_incoming(&update.payload) {
                            Ok(()) => debug!(replay = update.replay, "applied inbound update"),
                            Err(err) => warn!(%err, "dropping undecodable inbound update"),
                        }
                    }
                    InboundEvent::ReplayDone => {
                        let _ = restored_tx.send(true);
                    }
                }
            }
        });

        Self {
            inner,
            restored,
            tasks: vec![capture, listener],
        }
    }

    fn flush_handle(inner: &Arc<BridgeInner<D, C>>) -> FlushHandle {
        let weak: Weak<BridgeInner<D, C>> = Arc::downgrade(inner);
        FlushHandle::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            tokio::spawn(async move {
                if let Err(err) = inner.flush().await {
                    warn!(%err, "scheduled flush failed");
                }
            });
        })
    }

    /// Completion signal for the host's replay of stored updates.
    pub fn restored(&self) -> RestoreState {
        self.restored.clone()
    }

    /// Decode `payload` and apply it to the document under the reserved
    /// origin.
    ///
    /// Re-applying an already-applied update is a no-op by the document's
    /// merge construction, so at-least-once delivery is safe. A decode
    /// failure is fatal to this one message only.
    pub fn on_incoming_update(&self, payload: &Value) -> Result<()> {
        self.inner.apply_incoming(payload)
    }

    /// Merge, encode and transmit everything captured since the last flush.
    ///
    /// A no-op on an empty buffer. On failure the buffer is restored and
    /// [`has_outstanding`](Self::has_outstanding) stays true so callers can
    /// retry; the bridge itself never retries.
    pub async fn flush_now(&self) -> Result<()> {
        self.inner.flush().await
    }

    /// Drain and encode pending updates, returning the payload to the caller
    /// instead of transmitting it. `Ok(None)` means nothing was pending.
    ///
    /// Transmission then becomes the caller's job. Mixing this with
    /// [`flush_now`](Self::flush_now) risks double-send at the transport, not
    /// here: the buffer drain itself is exclusive.
    pub fn take_outstanding(&self) -> Result<Option<Value>> {
        let drained = self.inner.drain();
        if drained.is_empty() {
            return Ok(None);
        }
        match self.inner.merge_and_encode(&drained) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) => {
                self.inner.restore(drained);
                Err(err)
            }
        }
    }

    /// True iff captured deltas are awaiting transmission.
    pub fn has_outstanding(&self) -> bool {
        !self.inner.buffer.lock().is_empty()
    }

    /// Cancel the pending scheduled flush (if any) and stop the observer and
    /// listener tasks.
    ///
    /// Deliberately does NOT flush: updates that were captured but never
    /// flushed are lost unless the caller runs [`flush_now`](Self::flush_now)
    /// first. The upstream shutdown contract leaves that final flush to the
    /// caller.
    pub fn shutdown(&self) {
        self.inner.config.dispatch.shutdown();
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl<D: DeltaDocument, C: UpdateChannel> Drop for UpdateBridge<D, C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryHost;
    use crate::config::BridgeConfigBuilder;
    use crate::dispatch::{Immediate, RateLimited};
    use dsb_core::{Origin, SetDocument};
    use std::time::Duration;

    type Doc = Arc<RwLock<SetDocument>>;

    fn new_doc() -> Doc {
        Arc::new(RwLock::new(SetDocument::new()))
    }

    fn immediate_config() -> BridgeConfig {
        BridgeConfigBuilder::new().dispatch(Immediate).build()
    }

    // Dispatch policy parked far in the future, so only explicit calls
    // drain the buffer.
    fn manual_config() -> BridgeConfig {
        BridgeConfigBuilder::new()
            .dispatch(RateLimited::new(Duration::from_secs(3600)))
            .build()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn flush_on_empty_buffer_is_a_no_op() {
        let host = MemoryHost::new();
        let doc = new_doc();
        let bridge =
            UpdateBridge::initialize(doc, Arc::new(host.endpoint()), immediate_config());

        bridge.flush_now().await.unwrap();

        assert_eq!(host.stored(), 0);
        assert!(!bridge.has_outstanding());
    }

    #[tokio::test(start_paused = true)]
    async fn reserved_origin_deltas_are_never_buffered() {
        let host = MemoryHost::new();
        let doc = new_doc();
        let bridge =
            UpdateBridge::initialize(doc.clone(), Arc::new(host.endpoint()), manual_config());
        bridge.restored().wait().await;

        doc.write().insert_as("echoed", Origin::Replay).unwrap();
        settle().await;
        assert!(!bridge.has_outstanding());

        doc.write()
            .insert_as("foreign", Origin::Actor("importer".to_string()))
            .unwrap();
        settle().await;
        assert!(bridge.has_outstanding());
    }

    #[tokio::test(start_paused = true)]
    async fn take_outstanding_twice_returns_the_sentinel() {
        let host = MemoryHost::new();
        let doc = new_doc();
        let bridge =
            UpdateBridge::initialize(doc.clone(), Arc::new(host.endpoint()), manual_config());
        bridge.restored().wait().await;

        doc.write().insert("pending").unwrap();
        settle().await;

        let first = bridge.take_outstanding().unwrap();
        assert!(first.is_some());
        let second = bridge.take_outstanding().unwrap();
        assert!(second.is_none());
        assert!(!bridge.has_outstanding());
        // Nothing was transmitted on our behalf.
        assert_eq!(host.stored(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn has_outstanding_tracks_buffer_lifecycle() {
        let host = MemoryHost::new();
        let doc = new_doc();
        let bridge =
            UpdateBridge::initialize(doc.clone(), Arc::new(host.endpoint()), manual_config());
        bridge.restored().wait().await;

        assert!(!bridge.has_outstanding());
        doc.write().insert("a").unwrap();
        settle().await;
        assert!(bridge.has_outstanding());

        bridge.flush_now().await.unwrap();
        assert!(!bridge.has_outstanding());
        assert_eq!(host.stored(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn incoming_update_with_bad_shape_reports_decode_error() {
        let host = MemoryHost::new();
        let doc = new_doc();
        let bridge =
            UpdateBridge::initialize(doc.clone(), Arc::new(host.endpoint()), immediate_config());
        bridge.restored().wait().await;

        let err = bridge.on_incoming_update(&serde_json::json!(42));
        assert!(matches!(err, Err(BridgeError::Decode(_))));
        assert!(doc.read().is_empty());
    }
}
