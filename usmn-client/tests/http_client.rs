// usmn-client/tests/http_client.rs
// HttpClient and SettingsSync against a stub settings server

use std::time::Duration;

use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use usmn_client::{ClientConfig, ClientError, SettingValue, SettingsPatch, SettingsSync};

const TOKEN: &str = "stub-admin-token";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {TOKEN}").as_str())
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "code": 1001, "message": "Not authenticated" })),
    )
}

async fn read_settings(uri: Uri, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    // Echo what the client sent so the test can check cache busting
    let no_cache = headers
        .get(header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        == Some("no-cache");
    let busted = uri.query().is_some_and(|q| q.starts_with("_t="));
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "settings": {
                "websiteName": "Stub Store",
                "paypalEnabled": true,
                "noCache": no_cache,
                "busted": busted
            },
            "timestamp": "2026-10-16T08:30:00Z",
            "revision": 4
        })),
    )
}

async fn save_settings(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    if body["expectedRevision"] == json!(3) {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "code": 3001,
                "message": "Settings were changed by someone else",
                "details": { "expected": 3, "actual": 4 }
            })),
        );
    }
    if body["settings"].get("websiteName").is_none() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "code": 3003, "message": "websiteName is required" })),
        );
    }
    (StatusCode::OK, Json(json!({ "success": true, "revision": 5 })))
}

async fn status(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "paypalConfigured": true,
            "telegramConfigured": false,
            "usingDevelopmentKey": true
        })),
    )
}

async fn busy() -> (StatusCode, Json<Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "code": 9005, "message": "Settings backend timed out" })),
    )
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "upstream exploded")
}

async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/api/admin/settings", get(read_settings).post(save_settings))
        .route("/api/admin/settings/status", get(status))
        .route("/api/settings", get(broken))
        .route("/api/busy", get(busy));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_fetch_settings_busts_cache() {
    let base = spawn_stub().await;
    let client = ClientConfig::new(base)
        .with_token(TOKEN)
        .build_http_client()
        .unwrap();

    let envelope = client.fetch_settings().await.unwrap();

    assert_eq!(envelope.revision, Some(4));
    assert_eq!(envelope.timestamp.to_rfc3339(), "2026-10-16T08:30:00+00:00");
    assert_eq!(
        envelope.settings["websiteName"],
        SettingValue::from("Stub Store")
    );
    assert_eq!(envelope.settings["noCache"], SettingValue::Bool(true));
    assert_eq!(envelope.settings["busted"], SettingValue::Bool(true));
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let base = spawn_stub().await;
    let client = ClientConfig::new(base).build_http_client().unwrap();

    let err = client.fetch_settings().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
}

#[tokio::test]
async fn test_save_maps_status_codes() {
    let base = spawn_stub().await;
    let client = ClientConfig::new(base)
        .with_token(TOKEN)
        .build_http_client()
        .unwrap();

    let mut patch = SettingsPatch::new();
    patch.insert("websiteName".to_string(), Some(SettingValue::from("New")));

    let saved = client.save_settings(patch.clone(), Some(4)).await.unwrap();
    assert!(saved.success);
    assert_eq!(saved.revision, 5);

    match client.save_settings(patch, Some(3)).await {
        Err(ClientError::Conflict(message)) => {
            assert_eq!(message, "Settings were changed by someone else")
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    match client.save_settings(SettingsPatch::new(), None).await {
        Err(ClientError::Validation(message)) => assert_eq!(message, "websiteName is required"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_secret_status() {
    let base = spawn_stub().await;
    let client = ClientConfig::new(base)
        .with_token(TOKEN)
        .build_http_client()
        .unwrap();

    let status = client.secret_status().await.unwrap();
    assert!(status.paypal_configured);
    assert!(!status.telegram_configured);
    assert!(status.using_development_key);
}

#[tokio::test]
async fn test_non_json_error_body_is_kept() {
    let base = spawn_stub().await;
    let client = ClientConfig::new(base).build_http_client().unwrap();

    match client.fetch_public_settings().await {
        Err(ClientError::Internal(message)) => assert_eq!(message, "upstream exploded"),
        other => panic!("expected internal error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_backend_timeout_is_transient() {
    let base = spawn_stub().await;
    let client = ClientConfig::new(base).build_http_client().unwrap();

    let err = client.get::<Value>("api/busy").await.unwrap_err();
    assert!(err.is_transient());
    match err {
        ClientError::Unavailable(message) => assert_eq!(message, "Settings backend timed out"),
        other => panic!("expected unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sync_over_http() {
    let base = spawn_stub().await;
    let config = ClientConfig::new(base)
        .with_token(TOKEN)
        .with_poll_interval(Duration::from_secs(60));

    let sync = SettingsSync::connect(&config).unwrap();
    let mut rx = sync.subscribe();
    rx.wait_for(|state| !state.is_loading).await.unwrap();

    let settings = sync.settings().unwrap();
    assert_eq!(settings["websiteName"], SettingValue::from("Stub Store"));
    assert_eq!(sync.cached().await, Some(settings));
}
