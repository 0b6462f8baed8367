//! The server's metric set.
//!
//! Everything is registered once, at startup, into the shared `Registry`;
//! a name collision here is the only fatal metrics error.

use std::sync::Arc;
use std::time::Duration;

use memotrack_core::error::Result;
use memotrack_core::metrics::{Counter, Gauge, Histogram, Registry};

use crate::memo::PoolStats;

pub const HTTP_REQUEST_DURATION: &str = "memotrack_http_request_duration_seconds";
pub const HTTP_REQUESTS: &str = "memotrack_http_requests_total";
pub const MEMO_OPERATIONS: &str = "memotrack_memo_operations_total";
pub const ACTIVE_MEMOS: &str = "memotrack_active_memos";
pub const DB_CONNECTIONS: &str = "memotrack_db_connections";
pub const REFRESH_FAILURES: &str = "memotrack_refresh_failures_total";

#[derive(Clone)]
pub struct ServiceMetrics {
    registry: Arc<Registry>,
    pub http_request_duration: Histogram,
    pub http_requests: Counter,
    pub memo_operations: Counter,
    pub active_memos: Gauge,
    pub db_connections: Gauge,
    pub refresh_failures: Counter,
}

impl ServiceMetrics {
    /// Register every server metric into `registry`.
    pub fn register(registry: Arc<Registry>, request_buckets: &[f64]) -> Result<Self> {
        let http_request_duration = registry.register_histogram(
            HTTP_REQUEST_DURATION,
            "HTTP request latency in seconds.",
            &["method", "route", "status_code"],
            request_buckets,
        )?;
        let http_requests = registry.register_counter(
            HTTP_REQUESTS,
            "HTTP requests served.",
            &["method", "route", "status_code"],
        )?;
        let memo_operations = registry.register_counter(
            MEMO_OPERATIONS,
            "Memo operations by outcome.",
            &["operation", "outcome"],
        )?;
        let active_memos =
            registry.register_gauge(ACTIVE_MEMOS, "Memos currently in the active status.", &[])?;
        let db_connections =
            registry.register_gauge(DB_CONNECTIONS, "Database pool connections.", &["state"])?;
        let refresh_failures = registry.register_counter(
            REFRESH_FAILURES,
            "Failed active-memo refreshes.",
            &[],
        )?;

        Ok(Self {
            registry,
            http_request_duration,
            http_requests,
            memo_operations,
            active_memos,
            db_connections,
            refresh_failures,
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn render(&self) -> String {
        self.registry.render_exposition()
    }

    /// Record one finished HTTP request into the latency histogram and the
    /// request counter.
    pub fn observe_request(
        &self,
        method: &str,
        route: &str,
        status: u16,
        elapsed: Duration,
    ) -> Result<()> {
        let status = status.to_string();
        let labels = [("method", method), ("route", route), ("status_code", status.as_str())];
        self.http_request_duration.observe(&labels, elapsed.as_secs_f64())?;
        self.http_requests.inc(&labels)
    }

    /// Count a memo operation. Failures to record are logged, never surfaced.
    pub fn record_memo_op(&self, operation: &str, ok: bool) {
        let outcome = if ok { "success" } else { "error" };
        if let Err(e) = self
            .memo_operations
            .inc(&[("operation", operation), ("outcome", outcome)])
        {
            tracing::warn!(error = %e, operation, "memo operation metric not recorded");
        }
    }

    pub fn set_active_memos(&self, count: i64) -> Result<()> {
        self.active_memos.set(&[], count as f64)
    }

    pub fn set_pool_stats(&self, stats: PoolStats) -> Result<()> {
        self.db_connections.set(&[("state", "active")], f64::from(stats.active))?;
        self.db_connections.set(&[("state", "idle")], f64::from(stats.idle))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn metrics() -> ServiceMetrics {
        ServiceMetrics::register(Arc::new(Registry::new()), &[0.1, 1.0]).unwrap()
    }

    #[test]
    fn registering_twice_into_one_registry_fails() {
        let registry = Arc::new(Registry::new());
        ServiceMetrics::register(Arc::clone(&registry), &[1.0]).unwrap();
        let err = ServiceMetrics::register(registry, &[1.0]).err().unwrap();
        assert_eq!(err.client_code().as_str(), "DUPLICATE_NAME");
    }

    #[test]
    fn request_observation_feeds_both_metrics() {
        let m = metrics();
        m.observe_request("GET", "/api/memos/:id", 200, Duration::from_millis(50)).unwrap();
        m.observe_request("GET", "/api/memos/:id", 200, Duration::from_secs(2)).unwrap();

        let labels = [("method", "GET"), ("route", "/api/memos/:id"), ("status_code", "200")];
        let snap = m.http_request_duration.snapshot(&labels).unwrap().unwrap();
        assert_eq!(snap.count, 2);
        assert_eq!(snap.buckets[0], (0.1, 1));
        assert_eq!(m.http_requests.get(&labels).unwrap(), Some(2.0));
    }

    #[test]
    fn memo_ops_and_pool_stats() {
        let m = metrics();
        m.record_memo_op("create", true);
        m.record_memo_op("create", false);
        m.record_memo_op("create", true);
        let ok = [("operation", "create"), ("outcome", "success")];
        assert_eq!(m.memo_operations.get(&ok).unwrap(), Some(2.0));

        m.set_pool_stats(PoolStats { active: 2, idle: 3 }).unwrap();
        assert_eq!(m.db_connections.get(&[("state", "idle")]).unwrap(), Some(3.0));

        let text = m.render();
        assert!(text.contains("memotrack_db_connections{state=\"active\"} 2"));
        assert!(text.contains("# TYPE memotrack_active_memos gauge"));
    }
}
