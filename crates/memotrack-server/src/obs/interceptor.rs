//! Request timing.
//!
//! `track_requests` is attached with `Router::route_layer`, so by the time it
//! runs the router has resolved `MatchedPath`. The route label is always the
//! pattern (`/api/memos/:id`), never the raw path, which keeps the series count
//! bounded. Requests that hit no route are timed by the fallback under
//! [`UNMATCHED_ROUTE`].

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::app_state::AppState;
use crate::obs::metrics::ServiceMetrics;

/// Route label for requests no route matched.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Start/finish hooks around one request.
#[derive(Clone)]
pub struct RequestTimer {
    metrics: ServiceMetrics,
}

/// A request that has started but not finished.
#[must_use = "call RequestTimer::finish once the response is known"]
pub struct InFlight {
    method: Method,
    started: Instant,
}

impl RequestTimer {
    pub fn new(metrics: ServiceMetrics) -> Self {
        Self { metrics }
    }

    pub fn start(&self, method: &Method) -> InFlight {
        InFlight {
            method: method.clone(),
            started: Instant::now(),
        }
    }

    /// Record the finished request. Never fails: recording errors are logged
    /// and dropped so the response is unaffected.
    pub fn finish(&self, req: InFlight, route: &str, status: StatusCode) {
        let elapsed = req.started.elapsed();
        if let Err(e) =
            self.metrics
                .observe_request(req.method.as_str(), route, status.as_u16(), elapsed)
        {
            tracing::warn!(error = %e, route, status = status.as_u16(), "request timing not recorded");
        }
    }
}

/// Axum middleware timing every routed request.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());

    let timer = state.request_timer();
    let in_flight = timer.start(req.method());
    let resp = next.run(req).await;
    timer.finish(in_flight, &route, resp.status());
    resp
}
