#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use memotrack_server::{app_state::AppState, config, memo::InMemoryMemoStore, obs::RefreshOutcome, router};

fn state() -> AppState {
    let cfg = config::load_from_str("version: 1\n").unwrap();
    AppState::new(cfg, Arc::new(InMemoryMemoStore::new())).unwrap()
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn health_reports_ok_with_timestamp() {
    let app = router::build_router(state());
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["status"], "ok");
    assert!(v["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn metrics_endpoint_serves_exposition() {
    let app = router::build_router(state());
    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
    assert!(ct.starts_with("text/plain; version=0.0.4"));

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    let duration = body.find("# TYPE memotrack_http_request_duration_seconds histogram").unwrap();
    let active = body.find("# TYPE memotrack_active_memos gauge").unwrap();
    assert!(duration < active);
}

#[tokio::test]
async fn requests_are_timed_by_route_pattern() {
    let state = state();
    let app = router::build_router(state.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/memos",
        Some(json!({ "title": "Q3 plan", "author": "alice", "assignee": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = serde_json::from_str::<Value>(&body).unwrap()["id"].as_i64().unwrap();

    send(&app, Method::GET, &format!("/api/memos/{id}"), None).await;
    send(&app, Method::GET, "/api/memos/999", None).await;

    let m = state.metrics();
    let ok = [("method", "GET"), ("route", "/api/memos/:id"), ("status_code", "200")];
    let missing = [("method", "GET"), ("route", "/api/memos/:id"), ("status_code", "404")];
    assert_eq!(m.http_request_duration.snapshot(&ok).unwrap().unwrap().count, 1);
    assert_eq!(m.http_request_duration.snapshot(&missing).unwrap().unwrap().count, 1);

    let created = [("method", "POST"), ("route", "/api/memos"), ("status_code", "201")];
    assert_eq!(m.http_requests.get(&created).unwrap(), Some(1.0));
}

#[tokio::test]
async fn unknown_paths_share_one_series() {
    let state = state();
    let app = router::build_router(state.clone());

    for path in ["/nope/1", "/nope/2", "/nope/3"] {
        let (status, body) = send(&app, Method::GET, path, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("NOT_FOUND"));
    }

    let labels = [("method", "GET"), ("route", "unmatched"), ("status_code", "404")];
    let snap = state.metrics().http_request_duration.snapshot(&labels).unwrap().unwrap();
    assert_eq!(snap.count, 3);
}

#[tokio::test]
async fn memo_workflow_counts_outcomes() {
    let state = state();
    let app = router::build_router(state.clone());

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/memos",
        Some(json!({ "title": "Onboarding", "body": "read me", "author": "alice" })),
    )
    .await;
    let id = serde_json::from_str::<Value>(&body).unwrap()["id"].as_i64().unwrap();

    let (status, _) = send(&app, Method::POST, &format!("/api/memos/{id}/accept"), Some(json!({ "user": "bob" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, &format!("/api/memos/{id}/assign"), Some(json!({ "assignee": "bob" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, &format!("/api/memos/{id}/accept"), Some(json!({ "user": "bob" }))).await;
    assert_eq!(status, StatusCode::OK);
    let memo: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(memo["status"], "accepted");
    assert_eq!(memo["assignee"], "bob");

    let (_, body) = send(&app, Method::GET, "/api/stats", None).await;
    let stats: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(stats, json!({ "total": 1, "active": 0, "accepted": 1, "archived": 0 }));

    let ops = &state.metrics().memo_operations;
    assert_eq!(ops.get(&[("operation", "accept"), ("outcome", "error")]).unwrap(), Some(1.0));
    assert_eq!(ops.get(&[("operation", "accept"), ("outcome", "success")]).unwrap(), Some(1.0));
    assert_eq!(ops.get(&[("operation", "create"), ("outcome", "success")]).unwrap(), Some(1.0));
}

#[tokio::test]
async fn refresher_publishes_active_count_to_scrape() {
    let state = state();
    let app = router::build_router(state.clone());

    for title in ["a", "b"] {
        send(&app, Method::POST, "/api/memos", Some(json!({ "title": title, "author": "alice" }))).await;
    }
    let refresher = state.refresher();
    assert_eq!(refresher.refresh_once().await, RefreshOutcome::Updated(2));

    let (_, body) = send(&app, Method::GET, "/metrics", None).await;
    assert!(body.contains("\nmemotrack_active_memos 2\n"));
    // in-memory store has no pool
    assert!(!body.contains("memotrack_db_connections{"));
}
