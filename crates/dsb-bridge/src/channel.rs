//! Host channel contract and the in-memory host used by tests and the demo.
//!
//! The host is an append-only broadcast bus with at-least-once delivery:
//! every update a peer sends is stored and delivered to every listener,
//! including the sender's own. On subscription the host first replays the
//! stored log (each update flagged as replay), then emits
//! [`InboundEvent::ReplayDone`], then live updates follow. The bridge's
//! origin filter and the document's idempotent merge make the self-echo and
//! the duplicates safe.

use crate::error::ChannelError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// An update delivered by the host.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InboundUpdate {
    /// The JSON-shaped payload the sender passed to `send_update`.
    pub payload: Value,
    /// Human-readable description attached by the sender.
    pub descr: String,
    /// True for updates replayed from host storage, false for live ones.
    pub replay: bool,
}

/// Items delivered to a channel subscriber.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum InboundEvent {
    /// A stored or live update.
    Update(InboundUpdate),
    /// All previously stored updates have been delivered.
    ReplayDone,
}

/// Resolves once the host has finished replaying stored updates into the
/// document after bridge initialization.
#[derive(Clone, Debug)]
pub struct RestoreState {
    rx: watch::Receiver<bool>,
}

impl RestoreState {
    pub(crate) fn pair() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// True once replay has completed.
    pub fn is_restored(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for replay to complete.
    pub async fn wait(mut self) {
        // A dropped sender means the bridge is gone; nothing left to wait on.
        let _ = self.rx.wait_for(|restored| *restored).await;
    }
}

/// Contract the bridge requires from the host's broadcast update channel.
///
/// Payloads are restricted to JSON-representable shapes; binary deltas must
/// go through a codec first. Delivery is at-least-once and includes the
/// sender's own updates.
#[async_trait]
pub trait UpdateChannel: Send + Sync + 'static {
    /// Broadcast an update to every peer, the local one included.
    async fn send_update(&self, payload: Value, descr: &str) -> Result<(), ChannelError>;

    /// Register an inbound listener. Stored updates arrive first (with
    /// `replay` set), then [`InboundEvent::ReplayDone`], then live updates.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<InboundEvent>;
}

#[derive(Clone, Debug)]
struct StoredUpdate {
    payload: Value,
    descr: String,
}

#[derive(Default)]
struct HostState {
    log: Vec<StoredUpdate>,
    listeners: Vec<mpsc::UnboundedSender<InboundEvent>>,
    fail_sends: bool,
}

/// In-memory host shared by a set of peer endpoints, for tests and
/// simulation.
pub struct MemoryHost {
    state: Arc<Mutex<HostState>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState::default())),
        }
    }

    /// Hand out a peer endpoint on this host.
    pub fn endpoint(&self) -> MemoryChannel {
        MemoryChannel {
            state: Arc::clone(&self.state),
        }
    }

    /// Number of updates in the stored log.
    pub fn stored(&self) -> usize {
        self.state.lock().log.len()
    }

    /// Stored payloads, oldest first.
    pub fn stored_payloads(&self) -> Vec<Value> {
        self.state
            .lock()
            .log
            .iter()
            .map(|update| update.payload.clone())
            .collect()
    }

    /// Make subsequent sends fail, to exercise error paths.
    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

/// One peer's handle onto a [`MemoryHost`].
#[derive(Clone)]
pub struct MemoryChannel {
    state: Arc<Mutex<HostState>>,
}

#[async_trait]
impl UpdateChannel for MemoryChannel {
    async fn send_update(&self, payload: Value, descr: &str) -> Result<(), ChannelError> {
        let mut state = self.state.lock();
        if state.fail_sends {
            return Err(ChannelError::SendFailed("simulated send failure".into()));
        }
        state.log.push(StoredUpdate {
            payload: payload.clone(),
            descr: descr.to_string(),
        });
        // Deliver to every listener, dropping the ones that went away.
        state.listeners.retain(|tx| {
            tx.send(InboundEvent::Update(InboundUpdate {
                payload: payload.clone(),
                descr: descr.to_string(),
                replay: false,
            }))
            .is_ok()
        });
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<InboundEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        // Replay and registration happen under one lock, so no update can
        // slip between the stored log and the live stream.
        for stored in &state.log {
            let _ = tx.send(InboundEvent::Update(InboundUpdate {
                payload: stored.payload.clone(),
                descr: stored.descr.clone(),
                replay: true,
            }));
        }
        let _ = tx.send(InboundEvent::ReplayDone);
        state.listeners.push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscriber_gets_replay_then_marker_then_live() {
        let host = MemoryHost::new();
        let early = host.endpoint();
        early.send_update(json!("one"), "first").await.unwrap();

        let late = host.endpoint();
        let mut rx = late.subscribe();

        match rx.try_recv().unwrap() {
            InboundEvent::Update(update) => {
                assert!(update.replay);
                assert_eq!(update.payload, json!("one"));
                assert_eq!(update.descr, "first");
            }
            other => panic!("expected replayed update, got {:?}", other),
        }
        assert!(matches!(rx.try_recv().unwrap(), InboundEvent::ReplayDone));

        early.send_update(json!("two"), "second").await.unwrap();
        match rx.try_recv().unwrap() {
            InboundEvent::Update(update) => {
                assert!(!update.replay);
                assert_eq!(update.payload, json!("two"));
            }
            other => panic!("expected live update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn sender_hears_its_own_updates() {
        let host = MemoryHost::new();
        let peer = host.endpoint();
        let mut rx = peer.subscribe();
        assert!(matches!(rx.try_recv().unwrap(), InboundEvent::ReplayDone));

        peer.send_update(json!(1), "self").await.unwrap();
        assert!(matches!(rx.try_recv().unwrap(), InboundEvent::Update(_)));
    }

    #[tokio::test]
    async fn failing_host_rejects_sends_without_storing() {
        let host = MemoryHost::new();
        host.fail_sends(true);

        let result = host.endpoint().send_update(json!(1), "x").await;
        assert!(matches!(result, Err(ChannelError::SendFailed(_))));
        assert_eq!(host.stored(), 0);
    }
}
