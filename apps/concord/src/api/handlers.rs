//! # API Endpoint Handlers
//!
//! Concept handlers are shared by every collection; the concept kind comes
//! from the `Extension` layered on each collection's router.

use super::{
    AppState,
    types::{
        CountResponse, ErrorResponse, ExportResponse, HealthResponse, StatusResponse,
        WriteResponse, parse_concept,
    },
};
use crate::store::write_with_retry;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use concord_core::{Concept, ConceptKind, ConcordError, graph_to_bytes};

// =============================================================================
// ERRORS
// =============================================================================

/// Failure of a concept endpoint.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Core(ConcordError),
}

impl From<ConcordError> for ApiError {
    fn from(e: ConcordError) -> Self {
        Self::Core(e)
    }
}

/// HTTP status for an engine error.
pub fn status_for(err: &ConcordError) -> StatusCode {
    match err {
        ConcordError::Validation(_) => StatusCode::BAD_REQUEST,
        ConcordError::ConstraintViolation { .. } => StatusCode::CONFLICT,
        ConcordError::InconsistentStore { .. } | ConcordError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ConcordError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse::new(message))).into_response()
            }
            Self::Core(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    tracing::error!(error = %e, "request failed");
                }
                (status, Json(ErrorResponse::new(e.to_string()))).into_response()
            }
        }
    }
}

// =============================================================================
// HEALTH / STATUS / GTG
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Store counters.
pub async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let service = state.service.read().await;
    let metrics = service.metrics()?;
    Ok(Json(StatusResponse::new(service.backend().name(), metrics)))
}

/// Good-to-go: the store answers a read-only ping.
pub async fn gtg_handler(State(state): State<AppState>) -> Response {
    let service = state.service.read().await;
    match service.check() {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "good-to-go check failed");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

// =============================================================================
// CONCEPT HANDLERS
// =============================================================================

/// Write a concept. The body uuid must match the path.
pub async fn put_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<ConceptKind>,
    Path(uuid): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<WriteResponse>, ApiError> {
    let concept = parse_concept(kind, body)?;
    if concept.uuid() != uuid {
        return Err(ConcordError::Validation(format!(
            "uuid '{}' in body does not match path uuid '{}'",
            concept.uuid(),
            uuid
        ))
        .into());
    }

    let mut service = state.service.write().await;
    let summary = state.commit(&mut service, |service| {
        write_with_retry(service, &concept, state.max_attempts)
    })?;
    Ok(Json(WriteResponse::from(summary)))
}

/// Read a concept.
pub async fn get_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<ConceptKind>,
    Path(uuid): Path<String>,
) -> Result<Json<Concept>, ApiError> {
    let service = state.service.read().await;
    service
        .read(kind, &uuid)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} {} not found", kind, uuid)))
}

/// Delete a concept: 204 when identity data was removed, 404 otherwise.
pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<ConceptKind>,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut service = state.service.write().await;
    if !state.commit(&mut service, |service| service.delete(kind, &uuid))? {
        return Err(ApiError::NotFound(format!("{} {} not found", kind, uuid)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Number of concepts of the collection's kind.
pub async fn count_handler(
    State(state): State<AppState>,
    Extension(kind): Extension<ConceptKind>,
) -> Result<Json<CountResponse>, ApiError> {
    let service = state.service.read().await;
    Ok(Json(CountResponse {
        count: service.count(kind)?,
    }))
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Export the graph as a base64 snapshot.
pub async fn export_handler(State(state): State<AppState>) -> impl IntoResponse {
    let service = state.service.read().await;
    match graph_to_bytes(service.graph()) {
        Ok(bytes) => (StatusCode::OK, Json(ExportResponse::success(&bytes))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ExportResponse::error(format!("Export failed: {}", e))),
        ),
    }
}
