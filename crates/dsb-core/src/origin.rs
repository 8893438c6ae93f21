//! Causal-source tags for document mutations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies who caused a document mutation.
///
/// The bridge reserves exactly one value per document (by default
/// [`Origin::Replay`]) for the mutations it applies itself while replaying
/// remote or stored updates. Deltas tagged with the reserved value are never
/// re-captured for transmission; deltas with any other value are foreign and
/// eligible for the outbound buffer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Applied by the bridge while replaying a remote or stored update.
    Replay,
    /// A local user action.
    Local,
    /// Another named in-process actor (importer, undo manager, ...).
    Actor(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Replay => write!(f, "replay"),
            Origin::Local => write!(f, "local"),
            Origin::Actor(tag) => write!(f, "actor:{}", tag),
        }
    }
}
