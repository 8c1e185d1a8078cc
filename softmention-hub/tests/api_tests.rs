//! Integration tests for softmention-hub API endpoints
//!
//! Tests cover:
//! - Health endpoint (no auth required)
//! - API key guard on protected routes
//! - Multipart and JSON ingestion (201 / 409 / 400)
//! - COAR inbox: Accept/Reject, malformed and unknown notifications
//! - Blacklist administration
//! - Document and software reads

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Request, StatusCode, Uri},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use softmention_common::db::init_memory_database;
use softmention_hub::notify::{
    NotificationDispatcher, Provider, ProviderConfig, ProviderDirectory, ServiceIdentity,
    VisualizationClient,
};
use softmention_hub::{build_router, AppState, Blacklist};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tower::util::ServiceExt; // for `oneshot` method

const API_KEY: &str = "test-key";
const BOUNDARY: &str = "softmention-test-boundary";

/// Paths and bodies seen by the mock peer (HAL inbox + visualization)
type PeerLog = Arc<Mutex<Vec<(String, Value)>>>;

async fn record(State(log): State<PeerLog>, uri: Uri, body: Bytes) -> StatusCode {
    let payload = serde_json::from_slice(&body).unwrap_or(Value::Null);
    log.lock().await.push((uri.path().to_string(), payload));
    StatusCode::CREATED
}

async fn spawn_peer() -> (String, PeerLog) {
    let log: PeerLog = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/inbox/", post(record))
        .route("/api/*rest", post(record))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), log)
}

struct TestApp {
    router: Router,
    state: AppState,
    peer: PeerLog,
    _dir: TempDir,
}

/// Test helper: in-memory store, temp blacklist, mock peer for HAL and visualization
async fn setup_app(api_key: Option<&str>) -> TestApp {
    let (peer_url, peer) = spawn_peer().await;
    let dir = TempDir::new().unwrap();

    let pool = init_memory_database().await.expect("Should open in-memory database");
    let blacklist = Blacklist::empty(dir.path().join("blacklist.csv"));

    let providers = ProviderDirectory::default().with(
        Provider::Hal,
        ProviderConfig {
            base_url: "https://inria.hal.science".to_string(),
            inbox_url: format!("{}/inbox/", peer_url),
            token: None,
        },
    );
    let identity = ServiceIdentity {
        id: "https://mentions.example.org".to_string(),
        name: "Software Mentions".to_string(),
        inbox: "https://mentions.example.org/inbox".to_string(),
    };
    let dispatcher = NotificationDispatcher::new(identity, providers, Duration::from_secs(5)).unwrap();
    let visualization = VisualizationClient::new(Some(&peer_url), Duration::from_secs(5)).unwrap();

    let state = AppState::new(pool, blacklist, dispatcher, visualization)
        .with_api_key(api_key.map(str::to_string));

    TestApp {
        router: build_router(state.clone()),
        state,
        peer,
        _dir: dir,
    }
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// multipart/form-data with a `file` part and an optional `file_hal_id` part
fn upload_request(filename: &str, content: &Value, file_hal_id: Option<&str>) -> Request<Body> {
    let mut body = String::new();
    if let Some(id) = file_hal_id {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file_hal_id\"\r\n\r\n{id}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/json\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
    ));

    Request::builder()
        .method("POST")
        .uri("/insert")
        .header("x-api-key", API_KEY)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn extraction_result() -> Value {
    json!({
        "application": "softcite",
        "mentions": [{
            "type": "software",
            "software-type": "software",
            "software-name": { "rawForm": "GROBID", "normalizedForm": "Grobid" },
            "context": "The corpus was processed with GROBID.",
            "documentContextAttributes": {
                "used": { "value": true, "score": 0.8 },
                "created": { "value": false, "score": 0.1 },
                "shared": { "value": false, "score": 0.0 }
            }
        }]
    })
}

fn verdict(kind: &str, document_id: &str, software: &str) -> Value {
    json!({
        "@context": ["https://www.w3.org/ns/activitystreams", "https://purl.org/coar/notify"],
        "id": "urn:uuid:0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0",
        "type": kind,
        "actor": { "type": "Person", "id": "https://orcid.org/0000-0000-0000-0000" },
        "object": {
            "type": "Offer",
            "id": "urn:uuid:12345678-1234-1234-1234-123456789012",
            "object": {
                "type": "Document",
                "id": document_id,
                "sorg:citation": { "name": software, "type": "Software" }
            }
        }
    })
}

// =============================================================================
// Health and auth
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = setup_app(Some(API_KEY)).await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "softmention-hub");
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_protected_route_requires_key() {
    let app = setup_app(Some(API_KEY)).await;

    let missing = Request::builder().uri("/status").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let wrong = Request::builder()
        .uri("/status")
        .header("x-api-key", "nope")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(wrong).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.router.oneshot(request("GET", "/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["can_upload"], true);
    assert_eq!(body["tables"]["mention_edges"], true);
}

#[tokio::test]
async fn test_no_key_configured_disables_guard() {
    let app = setup_app(None).await;

    let request = Request::builder().uri("/api/blacklist/stats").body(Body::empty()).unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Ingestion
// =============================================================================

#[tokio::test]
async fn test_upload_then_duplicate() {
    let app = setup_app(Some(API_KEY)).await;

    let response = app
        .router
        .clone()
        .oneshot(upload_request("hal-001.software.json", &extraction_result(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "inserted");
    assert_eq!(body["file_hal_id"], "hal-001");
    assert_eq!(body["stored"], 1);
    assert_eq!(body["notifications"]["provider"], "hal");
    assert_eq!(body["notifications"]["success_count"], 1);
    assert_eq!(body["notifications"]["total_count"], 1);

    {
        let peer = app.peer.lock().await;
        assert_eq!(peer.len(), 1);
        let (path, payload) = &peer[0];
        assert_eq!(path, "/inbox/");
        assert_eq!(payload["object"]["id"], "hal-001");
        assert_eq!(payload["object"]["mentionType"], "used");
    }

    let response = app
        .router
        .oneshot(upload_request("hal-001.software.json", &extraction_result(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "already_exists");
    assert_eq!(body["notifications"], Value::Null);

    // Duplicates trigger no notifications
    assert_eq!(app.peer.lock().await.len(), 1);
}

#[tokio::test]
async fn test_upload_with_explicit_identifier() {
    let app = setup_app(Some(API_KEY)).await;

    let response = app
        .router
        .clone()
        .oneshot(upload_request("result.json", &extraction_result(), Some("hal-042")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.router.oneshot(request("GET", "/api/documents/hal-042")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["file_hal_id"], "hal-042");
}

#[tokio::test]
async fn test_upload_invalid_json_is_bad_request() {
    let app = setup_app(Some(API_KEY)).await;

    let content = json!({ "mentions": [{ "context": "no software name" }] });
    let response = app
        .router
        .clone()
        .oneshot(upload_request("hal-500.json", &content, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.router.oneshot(request("GET", "/api/documents/hal-500")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_json_ingestion_endpoint() {
    let app = setup_app(Some(API_KEY)).await;

    let body = json!({ "mentions": extraction_result()["mentions"].clone() });
    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/documents/hal-007/mentions", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/documents/hal-007/mentions", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .router
        .oneshot(request("GET", "/api/documents/hal-007/softwares/grouped"))
        .await
        .unwrap();
    let grouped = extract_json(response.into_body()).await;
    assert_eq!(
        grouped,
        json!([{
            "softwareName": "Grobid",
            "maxDocumentAttribute": "used",
            "contexts": ["The corpus was processed with GROBID."]
        }])
    );
}

#[tokio::test]
async fn test_blacklisted_names_not_stored_via_api() {
    let app = setup_app(Some(API_KEY)).await;
    app.state.blacklist.add("Grobid").await.unwrap();

    let response = app
        .router
        .clone()
        .oneshot(upload_request("hal-008.json", &extraction_result(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["stored"], 0);
    assert_eq!(body["blacklisted"], 1);
    assert_eq!(body["notifications"]["total_count"], 0);

    let response = app.router.oneshot(request("GET", "/api/software/Grobid")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!([]));
}

// =============================================================================
// Inbox
// =============================================================================

#[tokio::test]
async fn test_inbox_accept_updates_verification_and_forwards() {
    let app = setup_app(Some(API_KEY)).await;
    app.router
        .clone()
        .oneshot(upload_request("hal-01478788.json", &extraction_result(), None))
        .await
        .unwrap();

    // Inbox is public: no API key
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/inbox")
                .header("content-type", "application/ld+json")
                .body(Body::from(verdict("Accept", "oai:HAL:hal-01478788", "Grobid").to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["type"], "Accept");
    assert_eq!(body["actor"], "https://orcid.org/0000-0000-0000-0000");
    assert_eq!(body["updated"], 1);

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/documents/hal-01478788/softwares?name=Grobid"))
        .await
        .unwrap();
    let mentions = extract_json(response.into_body()).await;
    assert_eq!(mentions[0]["verification_by_author"], true);

    let peer = app.peer.lock().await;
    assert!(peer
        .iter()
        .any(|(path, _)| path == "/api/accepted_notification/hal-01478788/Grobid"));
    drop(peer);

    let response = app.router.oneshot(request("GET", "/notifications")).await.unwrap();
    let notifications = extract_json(response.into_body()).await;
    assert_eq!(notifications[0]["notification_type"], "Accept");
    assert_eq!(notifications[0]["actor_id"], "https://orcid.org/0000-0000-0000-0000");
}

#[tokio::test]
async fn test_inbox_reject_sets_false() {
    let app = setup_app(None).await;
    app.router
        .clone()
        .oneshot(upload_request("hal-002.json", &extraction_result(), None))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/inbox", verdict("Reject", "hal-002", "Grobid")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .router
        .oneshot(request("GET", "/api/documents/hal-002/softwares"))
        .await
        .unwrap();
    let mentions = extract_json(response.into_body()).await;
    assert_eq!(mentions[0]["verification_by_author"], false);

    let peer = app.peer.lock().await;
    assert!(peer
        .iter()
        .any(|(path, _)| path == "/api/rejected_notification/hal-002/Grobid"));
}

#[tokio::test]
async fn test_inbox_malformed_accept_rejected() {
    let app = setup_app(None).await;
    app.router
        .clone()
        .oneshot(upload_request("hal-003.json", &extraction_result(), None))
        .await
        .unwrap();

    let mut payload = verdict("Accept", "hal-003", "Grobid");
    payload["object"]["object"]
        .as_object_mut()
        .unwrap()
        .remove("sorg:citation");

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/inbox", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/inbox", json!("not an object")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing stored, nothing updated
    let response = app.router.clone().oneshot(request("GET", "/notifications")).await.unwrap();
    assert_eq!(extract_json(response.into_body()).await, json!([]));

    let response = app
        .router
        .oneshot(request("GET", "/api/documents/hal-003/softwares"))
        .await
        .unwrap();
    let mentions = extract_json(response.into_body()).await;
    assert_eq!(mentions[0]["verification_by_author"], Value::Null);
}

#[tokio::test]
async fn test_inbox_unknown_type_stored() {
    let app = setup_app(None).await;

    let payload = json!({
        "type": ["Announce", "coar-notify:EndorsementAction"],
        "actor": { "id": "https://peer.example.org" },
        "object": { "id": "https://peer.example.org/thing" }
    });
    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/inbox", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["updated"], 0);

    let response = app.router.oneshot(request("GET", "/notifications")).await.unwrap();
    let notifications = extract_json(response.into_body()).await;
    assert_eq!(notifications.as_array().unwrap().len(), 1);
    assert_eq!(notifications[0]["actor_id"], "https://peer.example.org");
}

#[tokio::test]
async fn test_inbox_description() {
    let app = setup_app(Some(API_KEY)).await;

    let request = Request::builder().uri("/inbox").body(Body::empty()).unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["supported_notification_types"][0]["type"], "Accept");
    assert_eq!(body["service"]["inbox"], "https://mentions.example.org/inbox");
}

// =============================================================================
// Blacklist
// =============================================================================

#[tokio::test]
async fn test_blacklist_lifecycle() {
    let app = setup_app(Some(API_KEY)).await;

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/blacklist", json!({ "term": "software" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/blacklist", json!({ "term": "software" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["changed"], false);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/blacklist/import",
            json!({ "csv": "term\nscript\nmodel\n", "overwrite": false }),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["imported"], 2);
    assert_eq!(body["total"], 3);

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/blacklist?q=SOFT"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["results"], json!(["software"]));

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/blacklist/export"))
        .await
        .unwrap();
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(csv.lines().collect::<Vec<_>>(), vec!["term", "model", "script", "software"]);

    let response = app
        .router
        .clone()
        .oneshot(request("DELETE", "/api/blacklist/script"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(request("DELETE", "/api/blacklist/script"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // File on disk and memory agree after reload
    let response = app
        .router
        .clone()
        .oneshot(request("POST", "/api/blacklist/reload"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_terms"], 2);

    let response = app.router.oneshot(request("GET", "/api/blacklist/stats")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_terms"], 2);
    assert_eq!(body["file_exists"], true);
}

#[tokio::test]
async fn test_blacklist_empty_term_rejected() {
    let app = setup_app(Some(API_KEY)).await;

    let response = app
        .router
        .oneshot(json_request("POST", "/api/blacklist", json!({ "term": "   " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_document_and_software_reads() {
    let app = setup_app(Some(API_KEY)).await;
    app.router
        .clone()
        .oneshot(upload_request("hal-010.json", &extraction_result(), None))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/documents/status"))
        .await
        .unwrap();
    assert_eq!(extract_json(response.into_body()).await["count"], 1);

    // Software reads are public
    let public = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

    let response = app.router.clone().oneshot(public("/api/softwares/status")).await.unwrap();
    assert_eq!(extract_json(response.into_body()).await["count"], 1);

    let response = app.router.clone().oneshot(public("/api/software/Grobid")).await.unwrap();
    let mentions = extract_json(response.into_body()).await;
    assert_eq!(mentions.as_array().unwrap().len(), 1);
    let mention_id = mentions[0]["id"].as_i64().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(public(&format!("/api/software_mention/{}", mention_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["file_hal_id"], "hal-010");

    let response = app.router.clone().oneshot(public("/api/software_mention/99999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .oneshot(request("GET", "/api/documents/hal-missing/softwares"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_document_software_by_name_path() {
    let app = setup_app(Some(API_KEY)).await;
    app.router
        .clone()
        .oneshot(upload_request("hal-012.json", &extraction_result(), None))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/documents/hal-012/softwares/Grobid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mentions = extract_json(response.into_body()).await;
    assert_eq!(mentions.as_array().unwrap().len(), 1);
    assert_eq!(mentions[0]["normalized_name"], "Grobid");

    // Same result as the query form
    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/documents/hal-012/softwares?name=Grobid"))
        .await
        .unwrap();
    assert_eq!(extract_json(response.into_body()).await, mentions);

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/documents/hal-012/softwares/SciPy"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(extract_json(response.into_body()).await.as_array().unwrap().is_empty());

    // The static segment still wins
    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/documents/hal-012/softwares/grouped"))
        .await
        .unwrap();
    let grouped = extract_json(response.into_body()).await;
    assert_eq!(grouped[0]["softwareName"], "Grobid");

    let response = app
        .router
        .oneshot(request("GET", "/api/documents/hal-missing/softwares/Grobid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
