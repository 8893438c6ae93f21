//! Document collaborator contract and the built-in reference document.
//!
//! The bridge does not own document state. It observes mutation events,
//! buffers the deltas of foreign-origin mutations, and applies inbound deltas
//! back under its reserved origin. Any CRDT-backed type can sit behind
//! [`DeltaDocument`]; [`SetDocument`] is the minimal in-tree implementation
//! used by the demo and the test suite.

use crate::delta::Delta;
use crate::gset::GSet;
use crate::lattice::Lattice;
use crate::origin::Origin;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors surfaced by document collaborators.
#[derive(Error, Debug, Clone)]
pub enum DocumentError {
    /// A delta could not be decoded back into document state.
    #[error("malformed delta: {0}")]
    MalformedDelta(String),

    /// Document state could not be serialized into a delta.
    #[error("delta serialization failed: {0}")]
    Serialization(String),
}

/// A mutation event delivered to document observers.
#[derive(Clone, Debug)]
pub struct UpdateEvent {
    /// The diff this mutation produced.
    pub delta: Delta,
    /// Who caused the mutation.
    pub origin: Origin,
}

/// Contract the bridge requires from a CRDT-backed document.
///
/// Implementations must keep `apply_update` idempotent (re-applying a
/// previously applied delta is a no-op) and `merge_updates` deterministic for
/// a given input sequence. Merge order may affect the combined delta's byte
/// layout but never its semantic result.
pub trait DeltaDocument: Send + Sync + 'static {
    /// Apply a delta, attributing the mutation to `origin`.
    ///
    /// Observers see the resulting [`UpdateEvent`] with that same origin,
    /// which is how replayed applications stay out of the capture path.
    fn apply_update(&mut self, delta: &Delta, origin: Origin) -> Result<(), DocumentError>;

    /// Combine an ordered sequence of deltas into one.
    fn merge_updates(deltas: &[Delta]) -> Result<Delta, DocumentError>
    where
        Self: Sized;

    /// Register a mutation observer. Every local or applied mutation is
    /// delivered to all current observers.
    fn observe_updates(&self) -> broadcast::Receiver<UpdateEvent>;
}

// Sized well above any burst the cooperative scheduler produces; a lagging
// observer drops its oldest events.
const OBSERVER_CAPACITY: usize = 256;

/// The built-in reference document: a grow-only set of string entries.
///
/// Deltas are JSON-serialized element sets; merge is set union; apply is a
/// lattice join, so re-applying any delta is a no-op.
pub struct SetDocument {
    state: GSet<String>,
    event_tx: broadcast::Sender<UpdateEvent>,
}

impl SetDocument {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(OBSERVER_CAPACITY);
        Self {
            state: GSet::new(),
            event_tx,
        }
    }

    /// Insert an entry as a local user action.
    pub fn insert(&mut self, value: impl Into<String>) -> Result<bool, DocumentError> {
        self.insert_as(value, Origin::Local)
    }

    /// Insert an entry attributed to an arbitrary origin.
    ///
    /// Returns false (and emits no event) if the entry was already present:
    /// no state change, no delta.
    pub fn insert_as(
        &mut self,
        value: impl Into<String>,
        origin: Origin,
    ) -> Result<bool, DocumentError> {
        let value = value.into();
        if self.state.contains(&value) {
            return Ok(false);
        }
        let change = GSet::singleton(value);
        self.state.join_assign(&change);
        let delta = encode_set(&change)?;
        let _ = self.event_tx.send(UpdateEvent { delta, origin });
        Ok(true)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.state.contains(value)
    }

    /// All entries, in lexicographic order.
    pub fn entries(&self) -> Vec<String> {
        self.state.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

impl Default for SetDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaDocument for SetDocument {
    fn apply_update(&mut self, delta: &Delta, origin: Origin) -> Result<(), DocumentError> {
        let incoming = decode_set(delta)?;
        self.state.join_assign(&incoming);
        let _ = self.event_tx.send(UpdateEvent {
            delta: delta.clone(),
            origin,
        });
        Ok(())
    }

    fn merge_updates(deltas: &[Delta]) -> Result<Delta, DocumentError> {
        let mut joined = GSet::bottom();
        for delta in deltas {
            joined.join_assign(&decode_set(delta)?);
        }
        encode_set(&joined)
    }

    fn observe_updates(&self) -> broadcast::Receiver<UpdateEvent> {
        self.event_tx.subscribe()
    }
}

fn encode_set(set: &GSet<String>) -> Result<Delta, DocumentError> {
    serde_json::to_vec(set)
        .map(Delta::new)
        .map_err(|e| DocumentError::Serialization(e.to_string()))
}

fn decode_set(delta: &Delta) -> Result<GSet<String>, DocumentError> {
    serde_json::from_slice(delta.as_bytes())
        .map_err(|e| DocumentError::MalformedDelta(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_emits_local_origin_event() {
        let mut doc = SetDocument::new();
        let mut events = doc.observe_updates();

        assert!(doc.insert("milk").unwrap());

        let event = events.try_recv().unwrap();
        assert_eq!(event.origin, Origin::Local);

        let mut other = SetDocument::new();
        other.apply_update(&event.delta, Origin::Replay).unwrap();
        assert!(other.contains("milk"));
    }

    #[test]
    fn duplicate_insert_emits_nothing() {
        let mut doc = SetDocument::new();
        let mut events = doc.observe_updates();

        assert!(doc.insert("once").unwrap());
        assert!(!doc.insert("once").unwrap());

        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn apply_update_is_idempotent() {
        let mut source = SetDocument::new();
        let mut events = source.observe_updates();
        source.insert("entry").unwrap();
        let delta = events.try_recv().unwrap().delta;

        let mut doc = SetDocument::new();
        doc.apply_update(&delta, Origin::Replay).unwrap();
        let once = doc.entries();
        doc.apply_update(&delta, Origin::Replay).unwrap();
        assert_eq!(doc.entries(), once);
    }

    #[test]
    fn apply_update_tags_observer_event_with_given_origin() {
        let mut source = SetDocument::new();
        let mut source_events = source.observe_updates();
        source.insert("x").unwrap();
        let delta = source_events.try_recv().unwrap().delta;

        let mut doc = SetDocument::new();
        let mut events = doc.observe_updates();
        doc.apply_update(&delta, Origin::Replay).unwrap();

        assert_eq!(events.try_recv().unwrap().origin, Origin::Replay);
    }

    #[test]
    fn merge_equals_sequential_apply() {
        let mut source = SetDocument::new();
        let mut events = source.observe_updates();
        for value in ["a", "b", "c"] {
            source.insert(value).unwrap();
        }
        let mut deltas = Vec::new();
        while let Ok(event) = events.try_recv() {
            deltas.push(event.delta);
        }

        let merged = SetDocument::merge_updates(&deltas).unwrap();
        let mut batched = SetDocument::new();
        batched.apply_update(&merged, Origin::Replay).unwrap();

        let mut sequential = SetDocument::new();
        for delta in &deltas {
            sequential.apply_update(delta, Origin::Replay).unwrap();
        }

        assert_eq!(batched.entries(), sequential.entries());
        assert_eq!(batched.entries(), source.entries());
    }

    #[test]
    fn malformed_delta_is_rejected() {
        let mut doc = SetDocument::new();
        let err = doc.apply_update(&Delta::new(b"not json".to_vec()), Origin::Replay);
        assert!(matches!(err, Err(DocumentError::MalformedDelta(_))));
        assert!(doc.is_empty());
    }
}
