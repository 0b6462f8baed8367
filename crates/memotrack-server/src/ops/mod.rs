//! Operational HTTP endpoints.
//!
//! - `/health`  : liveness, `{status, timestamp}`
//! - `/metrics` : Prometheus text format
//! - fallback   : JSON 404, timed under the `unmatched` route label

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use memotrack_core::error::MemoTrackError;
use memotrack_core::metrics::CONTENT_TYPE;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::obs::UNMATCHED_ROUTE;

pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = state.metrics().render();

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, CONTENT_TYPE)],
        body,
    )
        .into_response()
}

pub async fn not_found(State(state): State<AppState>, method: Method) -> Response {
    let timer = state.request_timer();
    let in_flight = timer.start(&method);
    let resp = ApiError(MemoTrackError::NotFound("no such route".into())).into_response();
    timer.finish(in_flight, UNMATCHED_ROUTE, resp.status());
    resp
}
