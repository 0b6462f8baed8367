//! Periodic refresh of the active-memo gauge.
//!
//! Runs once immediately and then every `interval`. A refresh is single-flight:
//! `refresh_once` claims an atomic flag (Idle -> Refreshing) and a concurrent
//! caller gets `Skipped` instead of queueing. The ticker uses
//! `MissedTickBehavior::Skip`, so a slow refresh drops ticks rather than
//! bunching them up. Data-access failures and timeouts are logged, counted,
//! and otherwise ignored: the gauge keeps its last good value and the next
//! tick runs on schedule.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use memotrack_core::error::{MemoTrackError, Result};

use crate::memo::ActiveMemoSource;
use crate::obs::metrics::ServiceMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefresherState {
    Idle,
    Refreshing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Gauge now holds this count.
    Updated(i64),
    /// Data access failed or timed out; gauge unchanged.
    Failed,
    /// Another refresh was already in flight.
    Skipped,
}

pub struct Refresher<S: ?Sized> {
    source: Arc<S>,
    metrics: ServiceMetrics,
    interval: Duration,
    timeout: Duration,
    refreshing: AtomicBool,
}

// Clears the in-flight flag on every exit path, including cancellation.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S> Refresher<S>
where
    S: ActiveMemoSource + ?Sized + 'static,
{
    pub fn new(source: Arc<S>, metrics: ServiceMetrics, interval: Duration, timeout: Duration) -> Self {
        Self {
            source,
            metrics,
            interval,
            timeout,
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> RefresherState {
        if self.refreshing.load(Ordering::Acquire) {
            RefresherState::Refreshing
        } else {
            RefresherState::Idle
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn refresh_once(&self) -> RefreshOutcome {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("active memo refresh already in flight; tick skipped");
            return RefreshOutcome::Skipped;
        }
        let _guard = FlightGuard(&self.refreshing);

        match self.fetch().await {
            Ok(count) => {
                if let Err(e) = self.metrics.set_active_memos(count) {
                    tracing::warn!(error = %e, "active memo gauge not updated");
                }
                if let Some(stats) = self.source.pool_stats() {
                    if let Err(e) = self.metrics.set_pool_stats(stats) {
                        tracing::warn!(error = %e, "db connection gauge not updated");
                    }
                }
                tracing::debug!(count, "active memos refreshed");
                RefreshOutcome::Updated(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "active memo refresh failed; keeping last value");
                if let Err(e) = self.metrics.refresh_failures.inc(&[]) {
                    tracing::warn!(error = %e, "refresh failure not counted");
                }
                RefreshOutcome::Failed
            }
        }
    }

    async fn fetch(&self) -> Result<i64> {
        match tokio::time::timeout(self.timeout, self.source.count_active_memos()).await {
            Ok(res) => res,
            Err(_) => Err(MemoTrackError::DataAccess(format!(
                "count_active_memos timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Tick until `shutdown` flips to `true` (or its sender is dropped). An
    /// in-flight refresh is abandoned on shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(interval = ?self.interval, "active memo refresher started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.refresh_once() => {}
                        _ = shutdown.changed() => break,
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("active memo refresher stopped");
    }

    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
