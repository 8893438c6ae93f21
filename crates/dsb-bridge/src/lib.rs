//! Larimar bridge - synchronizes a delta-CRDT document over a host's
//! append-only broadcast update channel.
//!
//! The host stores every broadcast update and replays the stored log to each
//! peer on startup; delivery is at-least-once and includes the sender's own
//! updates. The bridge makes that safe: inbound updates are applied under a
//! reserved origin that the capture path filters out (no echo loops), and
//! the document's idempotent merge absorbs duplicates. Outbound, captured
//! deltas are coalesced by a dispatch policy and merged into a single payload
//! per flush, because broadcast hosts meter bursty senders.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dsb_bridge::dispatch::RateLimited;
//! use dsb_bridge::{BridgeConfigBuilder, MemoryHost, UpdateBridge};
//! use dsb_core::SetDocument;
//! use parking_lot::RwLock;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let host = MemoryHost::new();
//! let doc = Arc::new(RwLock::new(SetDocument::new()));
//! let config = BridgeConfigBuilder::new()
//!     .dispatch(RateLimited::new(Duration::from_millis(500)))
//!     .build();
//!
//! let bridge = UpdateBridge::initialize(doc.clone(), Arc::new(host.endpoint()), config);
//! bridge.restored().wait().await;
//!
//! // Captured, coalesced and flushed to every peer on the host.
//! doc.write().insert("hello")?;
//! ```
//!
//! # Architecture
//!
//! - [`bridge`] - capture, buffering, flush and apply paths
//! - [`dispatch`] - flush scheduling strategies (immediate, rate-limited)
//! - [`codec`] - binary delta to JSON payload transforms
//! - [`channel`] - host channel contract and the in-memory host
//! - [`config`] - configuration surface
//! - [`error`] - error taxonomy

pub mod bridge;
pub mod channel;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;

// Re-exports for convenience
pub use bridge::UpdateBridge;
pub use channel::{
    InboundEvent, InboundUpdate, MemoryChannel, MemoryHost, RestoreState, UpdateChannel,
};
pub use codec::{Base64Codec, UpdateCodec};
pub use config::{BridgeConfig, BridgeConfigBuilder, DEFAULT_UPDATE_DESCR};
pub use dispatch::{DispatchPolicy, FlushHandle, Immediate, RateLimited, DEFAULT_RATE_LIMIT};
pub use error::{BridgeError, ChannelError, DecodeError, EncodeError, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bridge::UpdateBridge;
    pub use crate::channel::{MemoryHost, RestoreState, UpdateChannel};
    pub use crate::codec::{Base64Codec, UpdateCodec};
    pub use crate::config::{BridgeConfig, BridgeConfigBuilder};
    pub use crate::dispatch::{DispatchPolicy, Immediate, RateLimited};
    pub use crate::error::BridgeError;
}
