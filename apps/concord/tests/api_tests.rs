//! Integration tests for the Concord HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Tests are serialised under a mutex because the auth middleware reads
// CONCORD_API_KEY on every request.
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use concord::api::{
    AppState, CountResponse, ErrorResponse, ExportResponse, HealthResponse, StatusResponse,
    WriteResponse, create_router,
};
use concord_core::{ConceptKind, ConcordService, graph_from_bytes};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Mutex;

/// Mutex serialising tests that touch environment variables.
static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

const ORG1: &str = "1d891a2f-3b5a-4c07-a2a4-9d4bd0a6f6b9";
const ORG2: &str = "2a8f4c3e-7b1d-4e6f-9a0c-5d3e2f1b8c7a";
const ORG8: &str = "5c510ad1-2b73-4375-90e1-6ccbc50bd21f";
const ROLE: &str = "c4e1a4a2-9a79-4d6c-8c1f-1c3f1b0e8a11";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Guard holding the mutex; clears the API key on drop.
struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
        unsafe { std::env::remove_var("CONCORD_API_KEY") };
    }
}

fn lock_env() -> TestGuard {
    let guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe {
        std::env::remove_var("CONCORD_API_KEY");
        std::env::remove_var("CONCORD_RATE_LIMIT");
    }
    TestGuard { _guard: guard }
}

/// Create a test server over a fresh in-memory service.
fn create_test_server() -> (TestServer, TestGuard) {
    let guard = lock_env();
    let router = create_router(AppState::new(ConcordService::new()));
    (TestServer::new(router).unwrap(), guard)
}

fn organisation(uuid: &str, uuids: &[&str]) -> Value {
    json!({
        "uuid": uuid,
        "type": "Organisation",
        "properName": format!("Org {uuid}"),
        "alternativeIdentifiers": { "uuids": uuids },
    })
}

// =============================================================================
// HEALTH / STATUS / GTG
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_gtg_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/__gtg").await;

    response.assert_status_ok();
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_status_counts_kinds() {
    let (server, _guard) = create_test_server();

    server
        .put(&format!("/organisations/{ORG1}"))
        .json(&organisation(ORG1, &[ORG1]))
        .await
        .assert_status_ok();
    server
        .put(&format!("/roles/{ROLE}"))
        .json(&json!({ "uuid": ROLE, "isBoardRole": true, "prefLabel": "Chair" }))
        .await
        .assert_status_ok();

    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.backend, "memory");
    assert_eq!(status.organisations, 1);
    assert_eq!(status.roles, 1);
    assert!(status.node_count >= 4);
}

// =============================================================================
// CONCEPT ENDPOINTS
// =============================================================================

#[tokio::test]
async fn test_put_then_get_organisation() {
    let (server, _guard) = create_test_server();
    let body = json!({
        "uuid": ORG1,
        "type": "PublicCompany",
        "properName": "Acme plc",
        "shortName": "Acme",
        "parentOrganisation": ORG8,
        "alternativeIdentifiers": {
            "uuids": [ORG1],
            "TME": ["tme-acme"],
            "factsetIdentifier": "fs-acme",
            "leiCode": "lei-acme",
        },
    });

    let response = server.put(&format!("/organisations/{ORG1}")).json(&body).await;
    response.assert_status_ok();
    let written: WriteResponse = response.json();
    assert_eq!(written.uuid, ORG1);
    assert!(written.absorbed.is_empty());

    let response = server.get(&format!("/organisations/{ORG1}")).await;
    response.assert_status_ok();
    let read: Value = response.json();
    assert_eq!(read, body);
}

#[tokio::test]
async fn test_get_unknown_is_not_found() {
    let (server, _guard) = create_test_server();

    let response = server.get(&format!("/organisations/{ORG1}")).await;

    response.assert_status_not_found();
    let error: ErrorResponse = response.json();
    assert!(error.message.contains("not found"));
}

#[tokio::test]
async fn test_get_is_kind_scoped() {
    let (server, _guard) = create_test_server();
    server
        .put(&format!("/organisations/{ORG1}"))
        .json(&organisation(ORG1, &[ORG1]))
        .await
        .assert_status_ok();

    server
        .get(&format!("/roles/{ORG1}"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_put_with_mismatched_uuid_is_bad_request() {
    let (server, _guard) = create_test_server();

    let response = server
        .put(&format!("/organisations/{ORG2}"))
        .json(&organisation(ORG1, &[ORG1]))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    server
        .get(&format!("/organisations/{ORG1}"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_unsupported_authority_is_bad_request() {
    let (server, _guard) = create_test_server();
    let body = json!({
        "uuid": ORG1,
        "properName": "Acme",
        "alternativeIdentifiers": {
            "identifiers": [{ "authority": "DUNS", "identifierValue": "123" }],
        },
    });

    let response = server.put(&format!("/organisations/{ORG1}")).json(&body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let count: CountResponse = server.get("/organisations/__count").await.json();
    assert_eq!(count.count, 0);
}

#[tokio::test]
async fn test_duplicate_tme_is_conflict() {
    let (server, _guard) = create_test_server();
    let mut first = organisation(ORG1, &[ORG1]);
    first["alternativeIdentifiers"]["TME"] = json!(["tme-shared"]);
    let mut second = organisation(ORG2, &[ORG2]);
    second["alternativeIdentifiers"]["TME"] = json!(["tme-shared"]);

    server
        .put(&format!("/organisations/{ORG1}"))
        .json(&first)
        .await
        .assert_status_ok();
    let response = server.put(&format!("/organisations/{ORG2}")).json(&second).await;

    response.assert_status(StatusCode::CONFLICT);
    server
        .get(&format!("/organisations/{ORG2}"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_put_absorbs_alias() {
    let (server, _guard) = create_test_server();
    server
        .put(&format!("/organisations/{ORG2}"))
        .json(&organisation(ORG2, &[ORG2]))
        .await
        .assert_status_ok();

    let response = server
        .put(&format!("/organisations/{ORG1}"))
        .json(&organisation(ORG1, &[ORG1, ORG2]))
        .await;

    response.assert_status_ok();
    let written: WriteResponse = response.json();
    assert_eq!(written.absorbed, vec![ORG2.to_string()]);
    server
        .get(&format!("/organisations/{ORG2}"))
        .await
        .assert_status_not_found();
    let count: CountResponse = server.get("/organisations/__count").await.json();
    assert_eq!(count.count, 1);
}

#[tokio::test]
async fn test_delete_then_delete_again() {
    let (server, _guard) = create_test_server();
    server
        .put(&format!("/organisations/{ORG1}"))
        .json(&organisation(ORG1, &[ORG1]))
        .await
        .assert_status_ok();

    server
        .delete(&format!("/organisations/{ORG1}"))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get(&format!("/organisations/{ORG1}"))
        .await
        .assert_status_not_found();
    server
        .delete(&format!("/organisations/{ORG1}"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_role_round_trip() {
    let (server, _guard) = create_test_server();
    let body = json!({
        "uuid": ROLE,
        "isBoardRole": true,
        "prefLabel": "Chair",
        "alternativeIdentifiers": {
            "uuids": [ROLE],
            "factsetIdentifier": "fs-chair",
        },
    });

    server
        .put(&format!("/roles/{ROLE}"))
        .json(&body)
        .await
        .assert_status_ok();

    let read: Value = server.get(&format!("/roles/{ROLE}")).await.json();
    assert_eq!(read["isBoardRole"], json!(true));
    assert_eq!(read["prefLabel"], json!("Chair"));
    assert_eq!(
        read["alternativeIdentifiers"]["factsetIdentifier"],
        json!("fs-chair")
    );
    let count: CountResponse = server.get("/roles/__count").await.json();
    assert_eq!(count.count, 1);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let (server, _guard) = create_test_server();

    let response = server
        .put(&format!("/organisations/{ORG1}"))
        .bytes(bytes::Bytes::from("not valid json"))
        .content_type("application/json")
        .await;

    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let (server, _guard) = create_test_server();

    server.get("/people/abc").await.assert_status_not_found();
    assert_eq!(server.post("/health").await.status_code().as_u16(), 405);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let (server, _guard) = create_test_server();

    let response = server
        .put(&format!("/organisations/{ORG1}"))
        .bytes(bytes::Bytes::from(vec![b' '; 3 * 1024 * 1024]))
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

// =============================================================================
// SNAPSHOT PERSISTENCE
// =============================================================================

/// Create a test server over an in-memory service saved to `snapshot`.
fn create_snapshot_server(snapshot: &Path) -> (TestServer, TestGuard) {
    let guard = lock_env();
    let state = AppState::new(ConcordService::new()).with_snapshot(snapshot.to_path_buf());
    (TestServer::new(create_router(state)).unwrap(), guard)
}

fn read_snapshot(snapshot: &Path) -> ConcordService {
    ConcordService::with_graph(graph_from_bytes(&std::fs::read(snapshot).unwrap()).unwrap())
}

#[tokio::test]
async fn test_snapshot_follows_put_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("concord.snap");
    let (server, _guard) = create_snapshot_server(&snapshot);

    server
        .put(&format!("/organisations/{ORG1}"))
        .json(&organisation(ORG1, &[ORG1]))
        .await
        .assert_status_ok();
    let saved = read_snapshot(&snapshot);
    assert!(saved.read(ConceptKind::Organisation, ORG1).unwrap().is_some());

    server
        .delete(&format!("/organisations/{ORG1}"))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let saved = read_snapshot(&snapshot);
    assert!(saved.read(ConceptKind::Organisation, ORG1).unwrap().is_none());
}

#[tokio::test]
async fn test_failed_snapshot_save_discards_put() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("missing").join("concord.snap");
    let (server, _guard) = create_snapshot_server(&snapshot);

    server
        .put(&format!("/organisations/{ORG1}"))
        .json(&organisation(ORG1, &[ORG1]))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    server
        .get(&format!("/organisations/{ORG1}"))
        .await
        .assert_status_not_found();
    let count: CountResponse = server.get("/organisations/__count").await.json();
    assert_eq!(count.count, 0);
    assert!(!snapshot.exists());
}

#[tokio::test]
async fn test_failed_snapshot_save_discards_delete() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("concord.snap");
    let (server, _guard) = create_snapshot_server(&snapshot);

    server
        .put(&format!("/organisations/{ORG1}"))
        .json(&organisation(ORG1, &[ORG1]))
        .await
        .assert_status_ok();

    // A directory in place of the file makes the next save fail.
    std::fs::remove_file(&snapshot).unwrap();
    std::fs::create_dir(&snapshot).unwrap();

    server
        .delete(&format!("/organisations/{ORG1}"))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    server
        .get(&format!("/organisations/{ORG1}"))
        .await
        .assert_status_ok();
}

// =============================================================================
// EXPORT
// =============================================================================

#[tokio::test]
async fn test_export_decodes_to_graph() {
    use base64::Engine;

    let (server, _guard) = create_test_server();
    server
        .put(&format!("/organisations/{ORG1}"))
        .json(&organisation(ORG1, &[ORG1]))
        .await
        .assert_status_ok();

    let export: ExportResponse = server.get("/export").await.json();
    assert!(export.success);
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(export.data.unwrap())
        .unwrap();
    assert_eq!(export.size, Some(bytes.len()));
    let graph = graph_from_bytes(&bytes).unwrap();
    assert_eq!(graph.nodes_with_uuid(ORG1).len(), 1);
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

fn create_auth_test_server(api_key: &str) -> (TestServer, TestGuard) {
    let guard = lock_env();
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("CONCORD_API_KEY", api_key) };
    let router = create_router(AppState::new(ConcordService::new()));
    (TestServer::new(router).unwrap(), guard)
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let (server, _guard) = create_auth_test_server("secret-key");

    server
        .get("/status")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let (server, _guard) = create_auth_test_server("secret-key");

    let response = server
        .get("/organisations/__count")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer secret-key".parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_wrong_token_rejected() {
    let (server, _guard) = create_auth_test_server("secret-key");

    server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_probes_stay_open() {
    let (server, _guard) = create_auth_test_server("secret-key");

    server.get("/health").await.assert_status_ok();
    server.get("/__gtg").await.assert_status_ok();
}
