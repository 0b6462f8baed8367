//! Shared application state for the memotrack server.
//!
//! Built once in `main`: owns the config, the memo store, and the one metric
//! registry (through `ServiceMetrics`). Cloning is cheap; every handler,
//! the timing middleware, and the refresher see the same instances.

use std::sync::Arc;
use std::time::Duration;

use memotrack_core::error::Result;
use memotrack_core::metrics::Registry;

use crate::config::AppConfig;
use crate::memo::MemoStore;
use crate::obs::{RequestTimer, Refresher, ServiceMetrics};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: AppConfig,
    store: Arc<dyn MemoStore>,
    metrics: ServiceMetrics,
    timer: RequestTimer,
}

impl AppState {
    /// Build application state and register all metrics. A metric name
    /// collision here is a startup error.
    pub fn new(cfg: AppConfig, store: Arc<dyn MemoStore>) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let metrics = ServiceMetrics::register(registry, &cfg.metrics.request_duration_buckets)?;
        let timer = RequestTimer::new(metrics.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                store,
                metrics,
                timer,
            }),
        })
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.inner.cfg
    }

    pub fn store(&self) -> Arc<dyn MemoStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.inner.metrics
    }

    pub fn request_timer(&self) -> &RequestTimer {
        &self.inner.timer
    }

    /// Active-memo refresher wired to this state's store and metrics.
    pub fn refresher(&self) -> Refresher<dyn MemoStore> {
        let m = &self.inner.cfg.metrics;
        Refresher::new(
            self.store(),
            self.inner.metrics.clone(),
            Duration::from_millis(m.refresh_interval_ms),
            Duration::from_millis(m.refresh_timeout_ms),
        )
    }
}
