//! # Snapshot Format
//!
//! Binary snapshots of a Concord graph, used by `export` and by tooling that
//! copies a store between backends. File I/O lives in the app layer.
//!
//! Format: Header (5 bytes) + postcard-serialized graph data.
//! - 4 bytes: Magic ("CNCD")
//! - 1 byte: Version
//!
//! The payload size and the header are validated before any payload bytes
//! are decoded.

use crate::graph::{Graph, SerializableGraph};
use crate::primitives;
use crate::types::ConcordError;

/// Maximum allowed snapshot size.
pub const MAX_SNAPSHOT_SIZE: usize = 500 * 1024 * 1024; // 500 MB

const HEADER_LEN: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The snapshot header precedes all graph data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Create a header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), ConcordError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(ConcordError::Serialization(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(ConcordError::Serialization(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConcordError> {
        let Some(head) = bytes.get(..HEADER_LEN) else {
            return Err(ConcordError::Serialization(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&head[0..4]);
        Ok(Self {
            magic,
            version: head[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a graph to snapshot bytes.
pub fn graph_to_bytes(graph: &Graph) -> Result<Vec<u8>, ConcordError> {
    let header = SnapshotHeader::new();
    let payload = postcard::to_stdvec(&SerializableGraph::from(graph))
        .map_err(|e| ConcordError::Serialization(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a graph from snapshot bytes.
pub fn graph_from_bytes(bytes: &[u8]) -> Result<Graph, ConcordError> {
    if bytes.len() < HEADER_LEN {
        return Err(ConcordError::Serialization(format!(
            "Data too short: minimum {HEADER_LEN} bytes required"
        )));
    }
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(ConcordError::Serialization(format!(
            "Data size {} bytes exceeds maximum allowed {MAX_SNAPSHOT_SIZE} bytes",
            bytes.len()
        )));
    }

    SnapshotHeader::from_bytes(bytes)?.validate()?;

    let serializable: SerializableGraph =
        postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
            ConcordError::Serialization(format!("Failed to deserialize graph data: {e}"))
        })?;
    Ok(Graph::from(serializable))
}

// =============================================================================
// TESTS
// =============================================================================
