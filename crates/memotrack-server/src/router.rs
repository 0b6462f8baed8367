//! Axum router wiring.
//!
//! Every routed request passes through the timing middleware (`route_layer`,
//! so the matched pattern is known). Unrouted requests land on the fallback.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, memo::handlers, obs, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(ops::health))
        .route("/metrics", get(ops::metrics))
        .route("/api/memos", post(handlers::create_memo))
        .route("/api/memos/:id", get(handlers::get_memo))
        .route("/api/memos/:id/assign", post(handlers::assign_memo))
        .route("/api/memos/:id/accept", post(handlers::accept_memo))
        .route("/api/memos/:id/archive", post(handlers::archive_memo))
        .route("/api/stats", get(handlers::stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            obs::interceptor::track_requests,
        ))
        .fallback(ops::not_found)
        .with_state(state)
}
