//! # Store Plumbing
//!
//! Opening a service for the configured backend, saving file snapshots, and
//! the retrying write used by both the CLI and the HTTP API.

use crate::config::{Backend, StorageConfig};
use concord_core::{
    Concept, ConcordError, ConcordService, WriteSummary, graph_from_bytes, graph_to_bytes,
};
use std::path::Path;

/// Maximum snapshot file size accepted on load (500 MB).
const MAX_SNAPSHOT_FILE_SIZE: u64 = 500 * 1024 * 1024;

// =============================================================================
// OPEN / SAVE
// =============================================================================

/// Open the service described by `storage`.
///
/// The file backend starts empty when the snapshot does not exist yet.
pub fn open_service(storage: &StorageConfig) -> Result<ConcordService, ConcordError> {
    match storage.backend {
        Backend::Redb => ConcordService::with_redb(&storage.database),
        Backend::File => {
            let path = &storage.database;
            if !path.exists() {
                return Ok(ConcordService::new());
            }
            let metadata = std::fs::metadata(path)
                .map_err(|e| ConcordError::Store(format!("Cannot read snapshot metadata: {}", e)))?;
            if metadata.len() > MAX_SNAPSHOT_FILE_SIZE {
                return Err(ConcordError::Serialization(format!(
                    "Snapshot size {} bytes exceeds maximum allowed {} bytes",
                    metadata.len(),
                    MAX_SNAPSHOT_FILE_SIZE
                )));
            }
            let data = std::fs::read(path)
                .map_err(|e| ConcordError::Store(format!("Read snapshot: {}", e)))?;
            Ok(ConcordService::with_graph(graph_from_bytes(&data)?))
        }
    }
}

/// Write the in-memory graph to `path`. A persistent service is already
/// durable and is left alone.
pub fn save_snapshot(service: &ConcordService, path: &Path) -> Result<(), ConcordError> {
    if service.is_persistent() {
        return Ok(());
    }
    let data = graph_to_bytes(service.graph())?;
    std::fs::write(path, &data).map_err(|e| ConcordError::Store(format!("Write snapshot: {}", e)))
}

// =============================================================================
// RETRYING WRITE
// =============================================================================

/// Write `concept`, retrying the whole write while the failure is retryable.
pub fn write_with_retry(
    service: &mut ConcordService,
    concept: &Concept,
    max_attempts: u32,
) -> Result<WriteSummary, ConcordError> {
    let mut attempt = 1;
    loop {
        match service.write(concept) {
            Ok(summary) => return Ok(summary),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    uuid = concept.uuid(),
                    attempt,
                    max_attempts,
                    error = %e,
                    "retrying write"
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
