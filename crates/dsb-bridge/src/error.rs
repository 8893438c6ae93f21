//! Error taxonomy for the bridge.
//!
//! No error here is fatal to the bridge; each is scoped to the single
//! operation that raised it. A failed inbound decode skips that one message,
//! and a failed flush leaves the outbound buffer intact so the caller can
//! retry.

use dsb_core::DocumentError;
use thiserror::Error;

/// A malformed inbound payload.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("payload has unsupported shape: expected {expected}, found {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Buffered deltas could not be serialized into a host payload.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("delta is not representable as a host payload: {0}")]
    Unrepresentable(String),
}

/// The host channel refused or failed a send.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,

    #[error("host rejected payload: {0}")]
    Rejected(String),

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Error type for bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("inbound update dropped: {0}")]
    Decode(#[from] DecodeError),

    #[error("flush aborted: {0}")]
    Encode(#[from] EncodeError),

    #[error("transport: {0}")]
    Channel(#[from] ChannelError),

    #[error("document: {0}")]
    Document(#[from] DocumentError),
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
