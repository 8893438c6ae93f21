//! Core document and delta model for the Larimar delta-sync bridge.
//!
//! This crate defines the vocabulary the bridge in `dsb-bridge` speaks:
//!
//! - [`Delta`] - an opaque binary diff produced by a document mutation
//! - [`Origin`] - the causal-source tag attached to every mutation
//! - [`DeltaDocument`] - the contract a CRDT-backed document must satisfy
//!   (idempotent apply, deterministic merge, observable mutations)
//! - [`Lattice`] / [`GSet`] - the join-semilattice foundation and the
//!   grow-only set it is exercised with
//! - [`SetDocument`] - the built-in reference document used by the demo and
//!   the test suite
//!
//! The bridge never owns document state. It observes [`UpdateEvent`]s,
//! buffers the deltas of foreign-origin mutations, and applies inbound deltas
//! back under its reserved origin.

pub mod delta;
pub mod document;
pub mod gset;
pub mod lattice;
pub mod origin;

pub use delta::Delta;
pub use document::{DeltaDocument, DocumentError, SetDocument, UpdateEvent};
pub use gset::GSet;
pub use lattice::Lattice;
pub use origin::Origin;
