//! Postgres-backed memo store (`sqlx`). All statements are parameterized.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};

use memotrack_core::error::{MemoTrackError, Result};

use super::{ActiveMemoSource, MemoStore, PoolStats};
use crate::config::DatabaseSection;
use crate::memo::model::{check_accept, check_archive, check_assign, Memo, MemoStats, MemoStatus, NewMemo};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS memos (
    id          BIGSERIAL PRIMARY KEY,
    title       TEXT NOT NULL,
    body        TEXT NOT NULL DEFAULT '',
    author      TEXT NOT NULL,
    assignee    TEXT,
    status      TEXT NOT NULL DEFAULT 'active',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    accepted_at TIMESTAMPTZ
)";

const STATUS_INDEX: &str = "CREATE INDEX IF NOT EXISTS memos_status_idx ON memos (status)";

const COUNT_BY_STATUS: &str = "SELECT COUNT(*) FROM memos WHERE status = $1";

const INSERT_MEMO: &str = "INSERT INTO memos (title, body, author, assignee, status)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, title, body, author, assignee, status, created_at, accepted_at";

const SELECT_MEMO: &str = "SELECT id, title, body, author, assignee, status, created_at, accepted_at
    FROM memos WHERE id = $1";

const SELECT_MEMO_FOR_UPDATE: &str = "SELECT id, title, body, author, assignee, status, created_at, accepted_at
    FROM memos WHERE id = $1 FOR UPDATE";

const UPDATE_MEMO: &str = "UPDATE memos SET assignee = $2, status = $3, accepted_at = $4 WHERE id = $1
    RETURNING id, title, body, author, assignee, status, created_at, accepted_at";

const STATUS_COUNTS: &str = "SELECT status, COUNT(*) FROM memos GROUP BY status";

#[derive(sqlx::FromRow)]
struct MemoRow {
    id: i64,
    title: String,
    body: String,
    author: String,
    assignee: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
}

impl TryFrom<MemoRow> for Memo {
    type Error = MemoTrackError;

    fn try_from(row: MemoRow) -> Result<Self> {
        Ok(Memo {
            id: row.id,
            title: row.title,
            body: row.body,
            author: row.author,
            assignee: row.assignee,
            status: MemoStatus::parse(&row.status)?,
            created_at: row.created_at,
            accepted_at: row.accepted_at,
        })
    }
}

fn db_err(e: sqlx::Error) -> MemoTrackError {
    MemoTrackError::DataAccess(e.to_string())
}

pub struct PgMemoStore {
    pool: PgPool,
}

impl PgMemoStore {
    /// Build a lazily-connecting pool; the first query opens connections.
    pub fn connect_lazy(url: &str, cfg: &DatabaseSection) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy(url)
            .map_err(db_err)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `memos` table and status index if missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await.map_err(db_err)?;
        sqlx::query(STATUS_INDEX).execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }

    /// Lock one memo row, apply `f`, and write it back in one transaction.
    async fn transition<F>(&self, id: i64, f: F) -> Result<Memo>
    where
        F: FnOnce(&mut Memo) -> Result<()> + Send,
    {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut memo = fetch_for_update(&mut tx, id).await?;
        f(&mut memo)?;

        let row: MemoRow = sqlx::query_as(UPDATE_MEMO)
            .bind(id)
            .bind(memo.assignee.as_deref())
            .bind(memo.status.as_str())
            .bind(memo.accepted_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        row.try_into()
    }
}

async fn fetch_for_update(conn: &mut PgConnection, id: i64) -> Result<Memo> {
    let row: Option<MemoRow> = sqlx::query_as(SELECT_MEMO_FOR_UPDATE)
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(db_err)?;
    row.ok_or_else(|| MemoTrackError::NotFound(format!("memo {id}")))?
        .try_into()
}

#[async_trait]
impl ActiveMemoSource for PgMemoStore {
    async fn count_active_memos(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(COUNT_BY_STATUS)
            .bind(MemoStatus::Active.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    fn pool_stats(&self) -> Option<PoolStats> {
        let size = self.pool.size();
        let idle = u32::try_from(self.pool.num_idle()).unwrap_or(size);
        Some(PoolStats {
            active: size.saturating_sub(idle),
            idle,
        })
    }
}

#[async_trait]
impl MemoStore for PgMemoStore {
    async fn create_memo(&self, new: NewMemo) -> Result<Memo> {
        new.validate()?;
        let row: MemoRow = sqlx::query_as(INSERT_MEMO)
            .bind(&new.title)
            .bind(&new.body)
            .bind(&new.author)
            .bind(new.assignee.as_deref())
            .bind(MemoStatus::Active.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        row.try_into()
    }

    async fn get_memo(&self, id: i64) -> Result<Memo> {
        let row: Option<MemoRow> = sqlx::query_as(SELECT_MEMO)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.ok_or_else(|| MemoTrackError::NotFound(format!("memo {id}")))?
            .try_into()
    }

    async fn assign_memo(&self, id: i64, assignee: &str) -> Result<Memo> {
        let assignee = assignee.to_string();
        self.transition(id, move |m| {
            check_assign(m, &assignee)?;
            m.assignee = Some(assignee);
            Ok(())
        })
        .await
    }

    async fn accept_memo(&self, id: i64, user: &str) -> Result<Memo> {
        let user = user.to_string();
        self.transition(id, move |m| {
            check_accept(m, &user)?;
            m.status = MemoStatus::Accepted;
            m.accepted_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    async fn archive_memo(&self, id: i64) -> Result<Memo> {
        self.transition(id, |m| {
            check_archive(m)?;
            m.status = MemoStatus::Archived;
            Ok(())
        })
        .await
    }

    async fn stats(&self) -> Result<MemoStats> {
        let rows: Vec<(String, i64)> = sqlx::query_as(STATUS_COUNTS)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut stats = MemoStats::default();
        for (status, n) in rows {
            stats.total += n;
            match MemoStatus::parse(&status)? {
                MemoStatus::Active => stats.active = n,
                MemoStatus::Accepted => stats.accepted = n,
                MemoStatus::Archived => stats.archived = n,
            }
        }
        Ok(stats)
    }
}
