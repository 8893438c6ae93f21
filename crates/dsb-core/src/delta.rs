//! Opaque binary diffs exchanged between replicas.

use serde::{Deserialize, Serialize};

/// A binary-serializable diff describing one incremental change to a
/// document.
///
/// The bridge never inspects delta contents. It buffers them, asks the owning
/// document type to merge them, and ships the result through a codec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta(Vec<u8>);

impl Delta {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Delta {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Delta {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
