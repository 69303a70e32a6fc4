//! Integration tests for the clipkeep HTTP API.
//!
//! Each test builds its own history in a temporary directory, fills it through
//! the capture loop over a mock clipboard, and drives the router with
//! `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use clipkeep_api::handlers::{HealthResponse, PasteResponse};
use clipkeep_api::{create_router, AppState, ClipboardService, NoopInjector};
use clipkeep_capture::{CaptureLoop, CaptureSession, ChangeDetector, ClipboardSource, MockClipboard};
use clipkeep_core::config::{self, ClipkeepConfig};
use clipkeep_core::events::event_channel;
use clipkeep_core::types::Entry;
use clipkeep_storage::{BlobStore, HistoryStore};

// =============================================================================
// Helpers
// =============================================================================

const TEST_TOKEN: &str = "test-token-12345";

struct TestApp {
    _dir: tempfile::TempDir,
    state: AppState,
    mock: Arc<MockClipboard>,
    capture: CaptureLoop,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let history = Arc::new(HistoryStore::open(dir.path().join("history.json")).unwrap());
        let blobs = BlobStore::new(dir.path().join("images"));
        let mock = Arc::new(MockClipboard::new());
        let source: Arc<dyn ClipboardSource> = mock.clone();
        let detector = ChangeDetector::shared();
        let session = CaptureSession::shared();
        let events = event_channel();
        let config = config::shared(ClipkeepConfig::default());

        let capture = CaptureLoop::new(
            Arc::clone(&history),
            blobs.clone(),
            Arc::clone(&source),
            Arc::clone(&detector),
            Arc::clone(&session),
            events.clone(),
            Arc::clone(&config),
        );
        let service = ClipboardService::new(history, blobs, source, detector, session, events, config)
            .with_config_path(dir.path().join("config.toml"))
            .with_injector(Arc::new(NoopInjector));

        Self {
            _dir: dir,
            state: AppState::new(service, TEST_TOKEN),
            mock,
            capture,
        }
    }

    fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }

    fn copy(&self, texts: &[&str]) {
        for text in texts {
            self.mock.set_text(text);
            self.capture.tick();
        }
    }
}

fn authed(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", TEST_TOKEN))
        .body(Body::empty())
        .unwrap()
}

fn authed_json(method: &str, uri: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", TEST_TOKEN))
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn entries(resp: axum::response::Response) -> Vec<Entry> {
    assert_eq!(resp.status(), StatusCode::OK);
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

fn contents(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.content()).collect()
}

// =============================================================================
// Public endpoints and auth
// =============================================================================

#[tokio::test]
async fn test_health_no_auth_required() {
    let app = TestApp::new();
    app.copy(&["one"]);
    let resp = app
        .router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.entries, 1);
}

#[tokio::test]
async fn test_auth_missing_token_returns_401() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(Request::get("/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let json: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["error"], "unauthorized");
    assert!(json["message"].as_str().unwrap().contains("Missing"));
}

#[tokio::test]
async fn test_auth_invalid_and_malformed_tokens_return_401() {
    let app = TestApp::new();
    for header in ["Bearer wrong-token-value", TEST_TOKEN] {
        let resp = app
            .router()
            .oneshot(
                Request::get("/history")
                    .header("authorization", header)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "header {:?}", header);
    }
}

#[tokio::test]
async fn test_auth_required_on_all_protected_endpoints() {
    let app = TestApp::new();
    let endpoints = [
        ("GET", "/history"),
        ("GET", "/history/search?q=x"),
        ("DELETE", "/history/1"),
        ("POST", "/history/1/favorite"),
        ("POST", "/history/clear"),
        ("POST", "/paste"),
        ("GET", "/settings"),
        ("PUT", "/settings"),
        ("GET", "/capture/status"),
        ("POST", "/capture/pause"),
        ("POST", "/capture/resume"),
        ("GET", "/stream"),
    ];

    for (method, path) in endpoints {
        let resp = app
            .router()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(path)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.status(),
            StatusCode::UNAUTHORIZED,
            "Expected 401 for {} {}",
            method,
            path
        );
    }
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_history_empty() {
    let app = TestApp::new();
    let resp = app.router().oneshot(authed("GET", "/history")).await.unwrap();
    assert!(entries(resp).await.is_empty());
}

#[tokio::test]
async fn test_history_order_and_pagination() {
    let app = TestApp::new();
    app.copy(&["a", "b", "c", "d"]);

    let resp = app.router().oneshot(authed("GET", "/history")).await.unwrap();
    assert_eq!(contents(&entries(resp).await), vec!["d", "c", "b", "a"]);

    let resp = app
        .router()
        .oneshot(authed("GET", "/history?limit=2&offset=1"))
        .await
        .unwrap();
    assert_eq!(contents(&entries(resp).await), vec!["c", "b"]);

    let resp = app
        .router()
        .oneshot(authed("GET", "/history?offset=99"))
        .await
        .unwrap();
    assert!(entries(resp).await.is_empty());
}

#[tokio::test]
async fn test_history_rejects_oversized_limit() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(authed("GET", "/history?limit=100000"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_entry_wire_shape() {
    let app = TestApp::new();
    app.copy(&["shape"]);

    let resp = app.router().oneshot(authed("GET", "/history")).await.unwrap();
    let json: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    let entry = &json[0];
    assert_eq!(entry["type"], "text");
    assert_eq!(entry["content"], "shape");
    assert_eq!(entry["preview"], "shape");
    assert_eq!(entry["is_favorite"], 0);
    assert!(entry["id"].is_i64());
    assert!(entry["created_at"].is_string());
}

#[tokio::test]
async fn test_favorite_delete_clear_flow() {
    let app = TestApp::new();
    app.copy(&["a", "b", "c"]);
    let b = app.state.service.get_history(None, None)[1].id;

    let resp = app
        .router()
        .oneshot(authed("POST", &format!("/history/{}/favorite", b)))
        .await
        .unwrap();
    let page = entries(resp).await;
    assert_eq!(contents(&page), vec!["b", "c", "a"]);
    assert!(page[0].is_favorite);

    let a = page[2].id;
    let resp = app
        .router()
        .oneshot(authed("DELETE", &format!("/history/{}", a)))
        .await
        .unwrap();
    assert_eq!(contents(&entries(resp).await), vec!["b", "c"]);

    let resp = app
        .router()
        .oneshot(authed("POST", "/history/clear"))
        .await
        .unwrap();
    assert_eq!(contents(&entries(resp).await), vec!["b"]);
}

#[tokio::test]
async fn test_delete_unknown_id_is_no_op() {
    let app = TestApp::new();
    app.copy(&["keep"]);
    let resp = app
        .router()
        .oneshot(authed("DELETE", "/history/12345"))
        .await
        .unwrap();
    assert_eq!(contents(&entries(resp).await), vec!["keep"]);
}

#[tokio::test]
async fn test_invalid_id_returns_400() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(authed("DELETE", "/history/not-a-number"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_case_insensitive() {
    let app = TestApp::new();
    app.copy(&["Hello World", "other", "say hello"]);

    let resp = app
        .router()
        .oneshot(authed("GET", "/history/search?q=HELLO"))
        .await
        .unwrap();
    assert_eq!(
        contents(&entries(resp).await),
        vec!["say hello", "Hello World"]
    );
}

#[tokio::test]
async fn test_search_missing_q_returns_400() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(authed("GET", "/history/search"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_no_matches_is_empty() {
    let app = TestApp::new();
    app.copy(&["something"]);
    let resp = app
        .router()
        .oneshot(authed("GET", "/history/search?q=nothing"))
        .await
        .unwrap();
    assert!(entries(resp).await.is_empty());
}

// =============================================================================
// Paste
// =============================================================================

#[tokio::test]
async fn test_paste_by_id_writes_clipboard() {
    let app = TestApp::new();
    app.copy(&["older", "newer"]);
    let older = app.state.service.get_history(None, None)[1].id;

    let resp = app
        .router()
        .oneshot(authed_json("POST", "/paste", &format!(r#"{{"id":{}}}"#, older)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: PasteResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(body.pasted);
    assert_eq!(body.id, older);

    assert_eq!(app.mock.text().as_deref(), Some("older"));
    assert_eq!(app.capture.tick().captured(), 0);
}

#[tokio::test]
async fn test_paste_full_entry_body() {
    let app = TestApp::new();
    app.copy(&["round trip"]);
    let entry = app.state.service.get_history(None, None)[0].clone();
    app.mock.set_text("something else");

    let resp = app
        .router()
        .oneshot(authed_json(
            "POST",
            "/paste",
            &serde_json::to_string(&entry).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(app.mock.text().as_deref(), Some("round trip"));
}

#[tokio::test]
async fn test_paste_unknown_id_returns_404() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(authed_json("POST", "/paste", r#"{"id":42}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_paste_with_unavailable_clipboard_returns_503() {
    let app = TestApp::new();
    app.copy(&["x"]);
    let id = app.state.service.get_history(None, None)[0].id;
    app.mock.set_unavailable(true);

    let resp = app
        .router()
        .oneshot(authed_json("POST", "/paste", &format!(r#"{{"id":{}}}"#, id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_get_settings_defaults() {
    let app = TestApp::new();
    let resp = app.router().oneshot(authed("GET", "/settings")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let settings: ClipkeepConfig = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(settings.history.max_items, 100);
    assert_eq!(settings.ui.shortcut, "Ctrl+Shift+V");
}

#[tokio::test]
async fn test_update_settings_merges_and_applies_to_prune() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(authed_json(
            "PUT",
            "/settings",
            r##"{"history":{"max_items":2},"ui":{"theme_color":"#112233"}}"##,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let settings: ClipkeepConfig = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(settings.history.max_items, 2);
    assert_eq!(settings.history.page_size, 50);
    assert_eq!(settings.ui.theme_color, "#112233");
    assert_eq!(settings.ui.shortcut, "Ctrl+Shift+V");

    app.copy(&["1", "2", "3"]);
    assert_eq!(app.state.service.history_len(), 2);
}

#[tokio::test]
async fn test_update_settings_rejects_unknown_section_and_bad_values() {
    let app = TestApp::new();
    for body in [
        r#"{"nonsense":{"a":1}}"#,
        r#"{"history":{"max_items":"many"}}"#,
        r#"{"history":5}"#,
        r#"[1,2,3]"#,
    ] {
        let resp = app
            .router()
            .oneshot(authed_json("PUT", "/settings", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {}", body);
    }
    assert_eq!(app.state.service.get_settings(), ClipkeepConfig::default());
}

// =============================================================================
// Capture control
// =============================================================================

#[tokio::test]
async fn test_pause_and_resume_capture() {
    let app = TestApp::new();

    let resp = app
        .router()
        .oneshot(authed("POST", "/capture/pause"))
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["status"], "paused");

    app.copy(&["while paused"]);
    assert_eq!(app.state.service.history_len(), 0);

    let resp = app
        .router()
        .oneshot(authed("GET", "/capture/status"))
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["status"], "paused");

    let resp = app
        .router()
        .oneshot(authed("POST", "/capture/resume"))
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["status"], "active");

    app.copy(&["after resume"]);
    assert_eq!(app.state.service.history_len(), 1);
}

// =============================================================================
// Stream
// =============================================================================

#[tokio::test]
async fn test_stream_is_event_stream() {
    let app = TestApp::new();
    let resp = app.router().oneshot(authed("GET", "/stream")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
}
