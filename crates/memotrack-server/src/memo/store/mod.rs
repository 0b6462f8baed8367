//! Memo persistence.
//!
//! `MemoStore` is the narrow data-access seam the HTTP handlers and the
//! periodic refresher depend on. Two backends exist: Postgres (production)
//! and an in-memory map (dev mode and tests).

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use memotrack_core::error::Result;

use super::model::{Memo, MemoStats, NewMemo};
use crate::config::DatabaseSection;

pub use memory::InMemoryMemoStore;
pub use postgres::PgMemoStore;

/// Connection pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub active: u32,
    pub idle: u32,
}

/// What the periodic refresher needs from storage.
#[async_trait]
pub trait ActiveMemoSource: Send + Sync {
    /// Count of memos in the `active` status. Fails with `DataAccess` on
    /// connectivity or query failure.
    async fn count_active_memos(&self) -> Result<i64>;

    /// Pool occupancy, for backends that hold a pool.
    fn pool_stats(&self) -> Option<PoolStats> {
        None
    }
}

#[async_trait]
pub trait MemoStore: ActiveMemoSource {
    async fn create_memo(&self, new: NewMemo) -> Result<Memo>;
    async fn get_memo(&self, id: i64) -> Result<Memo>;
    async fn assign_memo(&self, id: i64, assignee: &str) -> Result<Memo>;
    /// Only the current assignee may accept an active memo.
    async fn accept_memo(&self, id: i64, user: &str) -> Result<Memo>;
    async fn archive_memo(&self, id: i64) -> Result<Memo>;
    async fn stats(&self) -> Result<MemoStats>;
}

const SCHEMA_ATTEMPTS: u32 = 5;
const SCHEMA_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Open the configured backend: Postgres when `database.url` is set (schema
/// ensured, with a few retries while the database comes up), else in-memory.
pub async fn open(cfg: &DatabaseSection) -> Result<Arc<dyn MemoStore>> {
    let Some(url) = cfg.url.as_deref() else {
        tracing::warn!("database.url not set; using in-memory memo store");
        return Ok(Arc::new(InMemoryMemoStore::new()));
    };

    let store = PgMemoStore::connect_lazy(url, cfg)?;
    let mut attempt = 1;
    loop {
        match store.ensure_schema().await {
            Ok(()) => break,
            Err(e) if attempt < SCHEMA_ATTEMPTS => {
                tracing::warn!(error = %e, attempt, "database not ready; retrying");
                attempt += 1;
                tokio::time::sleep(SCHEMA_RETRY_DELAY).await;
            }
            Err(e) => return Err(e),
        }
    }
    tracing::info!(max_connections = cfg.max_connections, "postgres memo store ready");
    Ok(Arc::new(store))
}
