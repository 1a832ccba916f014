//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use concord_core::{
    Concept, ConceptKind, ConcordError, Organisation, Role, StoreMetrics, WriteSummary,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Store status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub backend: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub organisations: usize,
    pub roles: usize,
}

impl StatusResponse {
    #[must_use]
    pub fn new(backend: &str, metrics: StoreMetrics) -> Self {
        Self {
            backend: backend.to_string(),
            node_count: metrics.node_count,
            edge_count: metrics.edge_count,
            organisations: metrics.organisation_count,
            roles: metrics.role_count,
        }
    }
}

// =============================================================================
// COUNT / WRITE / ERROR
// =============================================================================

/// Response of `GET /{collection}/__count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: usize,
}

/// Response of a successful `PUT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    pub uuid: String,
    /// Aliases absorbed into `uuid` by this write.
    pub absorbed: Vec<String>,
}

impl From<WriteSummary> for WriteResponse {
    fn from(summary: WriteSummary) -> Self {
        Self {
            uuid: summary.uuid,
            absorbed: summary.absorbed,
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// Snapshot export response. `data` is the base64-encoded snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: Option<String>,
    pub size: Option<usize>,
    pub error: Option<String>,
}

impl ExportResponse {
    /// Create a successful export response.
    pub fn success(bytes: &[u8]) -> Self {
        use base64::Engine;
        Self {
            success: true,
            data: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            size: Some(bytes.len()),
            error: None,
        }
    }

    /// Create an error export response.
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            size: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// CONCEPT PAYLOADS
// =============================================================================

/// Decode one record of `kind` from JSON.
pub fn parse_concept(kind: ConceptKind, value: serde_json::Value) -> Result<Concept, ConcordError> {
    let concept = match kind {
        ConceptKind::Organisation => serde_json::from_value::<Organisation>(value).map(Concept::from),
        ConceptKind::Role => serde_json::from_value::<Role>(value).map(Concept::from),
    };
    concept.map_err(|e| ConcordError::Validation(format!("Invalid {} payload: {}", kind, e)))
}

/// Decode a JSON object or array of objects of `kind`.
pub fn parse_concepts(kind: ConceptKind, data: &[u8]) -> Result<Vec<Concept>, ConcordError> {
    let value: serde_json::Value = serde_json::from_slice(data)
        .map_err(|e| ConcordError::Serialization(format!("Invalid JSON: {}", e)))?;
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| parse_concept(kind, item))
            .collect(),
        other => Ok(vec![parse_concept(kind, other)?]),
    }
}
