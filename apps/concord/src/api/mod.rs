//! # Concord HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Node, edge, organisation and role counts
//! - `GET /__gtg` - Good-to-go: store connectivity check
//! - `PUT|GET|DELETE /organisations/{uuid}` - Write, read, delete an organisation
//! - `GET /organisations/__count` - Number of organisations
//! - `PUT|GET|DELETE /roles/{uuid}` - Write, read, delete a role
//! - `GET /roles/__count` - Number of roles
//! - `GET /export` - Base64 snapshot of the graph
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `CONCORD_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `CONCORD_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `CONCORD_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::get_api_key_from_env;
pub use handlers::{ApiError, status_for};
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    CountResponse, ErrorResponse, ExportResponse, HealthResponse, StatusResponse, WriteResponse,
    parse_concept, parse_concepts,
};

use crate::store::save_snapshot;
use axum::{
    Extension, Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::get,
};
use concord_core::{ConceptKind, ConcordError, ConcordService};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state. Writers hold the write guard for a whole write, so
/// writes are serialised.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RwLock<ConcordService>>,
    /// Attempts per write on retryable failures.
    pub max_attempts: u32,
    /// Snapshot file rewritten after each mutation (file backend only).
    pub snapshot: Option<PathBuf>,
}

impl AppState {
    #[must_use]
    pub fn new(service: ConcordService) -> Self {
        Self {
            service: Arc::new(RwLock::new(service)),
            max_attempts: 3,
            snapshot: None,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_snapshot(mut self, path: PathBuf) -> Self {
        self.snapshot = Some(path);
        self
    }

    /// Apply a mutation and rewrite the snapshot file, if one is configured.
    ///
    /// With a snapshot the mutation runs on a staged copy of the graph, which
    /// replaces the served one only after the file is written.
    fn commit<T>(
        &self,
        service: &mut ConcordService,
        op: impl FnOnce(&mut ConcordService) -> Result<T, ConcordError>,
    ) -> Result<T, ConcordError> {
        let Some(path) = self.snapshot.as_ref().filter(|_| !service.is_persistent()) else {
            return op(service);
        };
        let mut staged = ConcordService::with_graph(service.graph().clone())
            .with_registry(service.registry().clone());
        let outcome = op(&mut staged)?;
        save_snapshot(&staged, path)?;
        *service = staged;
        Ok(outcome)
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from `CONCORD_CORS_ORIGINS`.
///
/// - `*`: every origin (development only)
/// - unset or no valid entry: localhost only
/// - otherwise: the comma-separated origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("CONCORD_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (CONCORD_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in CONCORD_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                restricted_cors(allowed_origins)
            }
        }
        None => build_localhost_cors(),
    }
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn build_localhost_cors() -> CorsLayer {
    let origins = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();
    restricted_cors(origins)
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Routes of one concept collection; the handlers read the kind from the
/// `Extension`.
fn concept_routes(kind: ConceptKind) -> Router<AppState> {
    Router::new()
        .route("/__count", get(handlers::count_handler))
        .route(
            "/{uuid}",
            get(handlers::get_handler)
                .put(handlers::put_handler)
                .delete(handlers::delete_handler),
        )
        .layer(Extension(kind))
}

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing
/// 2. CORS
/// 3. Rate limiting (if enabled)
/// 4. Authentication (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible. \
             Set CONCORD_API_KEY to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/__gtg", get(handlers::gtg_handler))
        .route("/export", get(handlers::export_handler));
    for kind in [ConceptKind::Organisation, ConceptKind::Role] {
        router = router.nest(&format!("/{}", kind.collection()), concept_routes(kind));
    }

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

/// Start the HTTP server and serve until Ctrl+C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), ConcordError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ConcordError::Store(format!("Bind failed: {}", e)))?;

    tracing::info!("Concord HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ConcordError::Store(format!("Server error: {}", e)))
}
