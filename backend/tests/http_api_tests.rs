//! End-to-end tests of the HTTP surface against the in-memory and degraded stores.

mod support;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use event_log_ingest::config::ServerConfig;
use event_log_ingest::db::{LocalRepository, LogStore, StoreFactory};
use event_log_ingest::http::{create_router, AppState};

use support::{get_health, post_log, send};

fn local_app() -> (Router, Arc<LocalRepository>) {
    let repo = Arc::new(LocalRepository::new());
    let state = AppState::new(repo.clone() as Arc<dyn LogStore>);
    let app = create_router(state, &ServerConfig::default().allowed_origins);
    (app, repo)
}

fn degraded_app() -> Router {
    let state = AppState::new(StoreFactory::create_unavailable("connection refused"));
    create_router(state, &ServerConfig::default().allowed_origins)
}

#[tokio::test]
async fn test_log_page_view_is_captured() {
    let (app, repo) = local_app();
    let before = Utc::now();

    let (status, _, body) = send(
        app,
        post_log(r#"{"event_type":"page_view","path":"/home"}"#),
    )
    .await;
    let after = Utc::now();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "captured"}));

    let docs = repo.documents();
    assert_eq!(docs.len(), 1);
    let entry = &docs[0].entry;
    assert_eq!(entry.event_type, "page_view");
    assert_eq!(entry.path.as_deref(), Some("/home"));
    let ts = entry.timestamp.expect("timestamp should be stamped");
    assert!(ts >= before && ts <= after, "timestamp {} not in [{}, {}]", ts, before, after);
}

#[tokio::test]
async fn test_log_missing_event_type_is_rejected() {
    let (app, repo) = local_app();

    let (status, _, body) = send(app, post_log(r#"{"path":"/home"}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "event_type is required");
    assert!(repo.is_empty());
}

#[tokio::test]
async fn test_log_malformed_json_is_rejected() {
    let (app, repo) = local_app();

    for payload in ["{", "[]", "\"view_page\"", ""] {
        let (status, _, body) = send(app.clone(), post_log(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {:?}", payload);
        assert!(body["error"].as_str().unwrap().starts_with("invalid JSON"));
    }
    assert!(repo.is_empty());
}

#[tokio::test]
async fn test_log_wrong_meta_type_is_rejected() {
    let (app, repo) = local_app();

    let (status, _, body) = send(
        app,
        post_log(r#"{"event_type":"search","meta":{"count":2}}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid type"));
    assert!(repo.is_empty());
}

#[tokio::test]
async fn test_log_keeps_explicit_timestamp() {
    let (app, repo) = local_app();
    let payload = json!({
        "user_id": "guest",
        "event_type": "conversion",
        "path": "/hotel-match",
        "meta": {"hotel_id": "h-42"},
        "timestamp": "2024-02-29T08:15:30.250Z"
    });

    let (status, _, _) = send(app, post_log(payload.to_string())).await;
    assert_eq!(status, StatusCode::OK);

    let docs = repo.documents();
    assert_eq!(docs.len(), 1);
    let entry = &docs[0].entry;
    let expected: DateTime<Utc> = "2024-02-29T08:15:30.250Z".parse().unwrap();
    assert_eq!(entry.timestamp, Some(expected));
    assert_eq!(entry.user_id.as_deref(), Some("guest"));
    assert_eq!(
        entry.meta.as_ref().and_then(|m| m.get("hotel_id")).map(String::as_str),
        Some("h-42")
    );
}

#[tokio::test]
async fn test_log_zero_timestamp_is_replaced() {
    let (app, repo) = local_app();

    let (status, _, _) = send(
        app,
        post_log(r#"{"event_type":"view_page","timestamp":"0001-01-01T00:00:00Z"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let ts = repo.documents()[0].entry.timestamp.unwrap();
    assert!(ts > Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
}

#[tokio::test]
async fn test_log_unix_epoch_timestamp_is_kept() {
    let (app, repo) = local_app();

    let (status, _, _) = send(
        app,
        post_log(r#"{"event_type":"view_page","timestamp":"1970-01-01T00:00:00Z"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        repo.documents()[0].entry.timestamp,
        Some(DateTime::<Utc>::UNIX_EPOCH)
    );
}

#[tokio::test]
async fn test_log_whitespace_event_type_is_captured() {
    let (app, repo) = local_app();

    let (status, _, body) = send(app, post_log(r#"{"event_type":" "}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "captured");
    let docs = repo.documents();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].entry.event_type, " ");
}

#[tokio::test]
async fn test_log_accepts_body_without_content_type() {
    let (app, repo) = local_app();
    let request = Request::builder()
        .method("POST")
        .uri("/log")
        .body(Body::from(r#"{"event_type":"click_button"}"#))
        .unwrap();

    let (status, _, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(repo.len(), 1);
}

#[tokio::test]
async fn test_each_post_creates_a_document() {
    let (app, repo) = local_app();

    for _ in 0..3 {
        let (status, _, _) = send(app.clone(), post_log(r#"{"event_type":"search"}"#)).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(repo.len(), 3);
}

#[tokio::test]
async fn test_health_ok_with_store() {
    let (app, _) = local_app();

    let (status, _, body) = send(app, get_health()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_health_reports_db_down_when_degraded() {
    let (status, _, body) = send(degraded_app(), get_health()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "db_down"}));
}

#[tokio::test]
async fn test_degraded_log_returns_generic_500() {
    let app = degraded_app();

    for _ in 0..2 {
        let (status, _, body) = send(
            app.clone(),
            post_log(r#"{"event_type":"page_view","path":"/home"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "failed to save log"}));
    }

    // Still serving after failures
    let (status, _, _) = send(app, get_health()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_degraded_still_validates_first() {
    let (status, _, body) = send(degraded_app(), post_log(r#"{"path":"/"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "event_type is required");
}

#[tokio::test]
async fn test_closed_store_fails_writes() {
    let (app, repo) = local_app();
    repo.close().await.unwrap();

    let (status, _, body) = send(app.clone(), post_log(r#"{"event_type":"search"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "failed to save log");

    let (_, _, body) = send(app, get_health()).await;
    assert_eq!(body["status"], "db_down");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _) = local_app();
    let request = Request::builder()
        .method("GET")
        .uri("/logs")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_on_log_not_allowed() {
    let (app, _) = local_app();
    let request = Request::builder()
        .method("GET")
        .uri("/log")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
